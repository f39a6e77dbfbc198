use std::sync::Arc;

use reelforge_core::{
    BatchOrchestrator, Config, DeliveryMode, PoolStatus, SanitizedConfig, StorageManager,
};

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: Arc<BatchOrchestrator>,
    converter_name: String,
}

impl AppState {
    pub fn new(
        config: Config,
        orchestrator: Arc<BatchOrchestrator>,
        converter_name: impl Into<String>,
    ) -> Self {
        Self {
            config,
            orchestrator,
            converter_name: converter_name.into(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn orchestrator(&self) -> &BatchOrchestrator {
        &self.orchestrator
    }

    pub fn storage(&self) -> &StorageManager {
        self.orchestrator.storage()
    }

    pub fn delivery(&self) -> DeliveryMode {
        self.config.server.delivery
    }

    pub fn max_files(&self) -> usize {
        self.config.batch.max_files
    }

    pub fn max_file_bytes(&self) -> usize {
        self.config.server.max_file_bytes
    }

    pub fn converter_name(&self) -> &str {
        &self.converter_name
    }

    pub fn pool_status(&self) -> PoolStatus {
        self.orchestrator.status()
    }
}
