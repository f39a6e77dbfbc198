pub mod batch;
pub mod config;
pub mod converter;
pub mod job;
pub mod metrics;
pub mod storage;
pub mod sweeper;
pub mod testing;

pub use batch::{BatchConfig, BatchError, BatchOrchestrator, PoolStatus};
pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, Config,
    ConfigError, DeliveryMode, SanitizedConfig,
};
pub use converter::{Converter, ConverterConfig, ConverterError, FfmpegConverter};
pub use job::{BatchResult, ErrorKind, JobDescriptor, JobOutcome, JobPayload, TargetFormat};
pub use storage::{StorageConfig, StorageError, StorageManager};
pub use sweeper::{RetentionSweeper, SweepReport, SweeperConfig};
