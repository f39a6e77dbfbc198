use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Batch limits are usable (at least one file, at least one worker)
/// - Timeouts are non-zero
/// - GIF frame rate is within 1..=50
/// - Sweeper retention is not shorter than its interval
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }
    if config.server.max_upload_bytes == 0 {
        return Err(invalid("server.max_upload_bytes cannot be 0"));
    }
    if config.server.max_file_bytes == 0 {
        return Err(invalid("server.max_file_bytes cannot be 0"));
    }

    // Batch validation
    if config.batch.max_files == 0 {
        return Err(invalid("batch.max_files must be at least 1"));
    }
    if config.batch.concurrency == 0 {
        return Err(invalid("batch.concurrency must be at least 1"));
    }
    if config.batch.timeout_secs == 0 {
        return Err(invalid("batch.timeout_secs cannot be 0"));
    }

    // Converter validation
    if config.converter.timeout_secs == 0 {
        return Err(invalid("converter.timeout_secs cannot be 0"));
    }
    if !(1..=50).contains(&config.converter.gif_fps) {
        return Err(invalid(format!(
            "converter.gif_fps must be between 1 and 50, got {}",
            config.converter.gif_fps
        )));
    }

    // Sweeper validation
    if config.sweeper.enabled {
        if config.sweeper.interval_secs == 0 {
            return Err(invalid("sweeper.interval_secs cannot be 0"));
        }
        if config.sweeper.retention_secs < config.sweeper.interval_secs {
            return Err(invalid(format!(
                "sweeper.retention_secs ({}) must not be shorter than sweeper.interval_secs ({})",
                config.sweeper.retention_secs, config.sweeper.interval_secs
            )));
        }
    }

    Ok(())
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}
