//! Retention sweeper: background removal of orphaned scratch files.

mod config;
mod runner;

pub use config::SweeperConfig;
pub use runner::{RetentionSweeper, SweepReport};
