//! FFmpeg-based converter implementation.

use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::args::{build_plan, LinearQualityPolicy, PlanPaths, QualityPolicy};
use super::config::ConverterConfig;
use super::error::ConverterError;
use super::traits::Converter;
use super::types::ConversionOutput;
use crate::job::JobDescriptor;
use crate::storage::ScratchPair;

/// Lines of stderr kept in failure messages.
const STDERR_TAIL_LINES: usize = 20;

/// FFmpeg-based converter implementation.
///
/// Holds only immutable configuration, so one instance can serve any number
/// of concurrent jobs.
#[derive(Debug, Clone)]
pub struct FfmpegConverter {
    config: ConverterConfig,
    policy: Arc<dyn QualityPolicy>,
}

impl FfmpegConverter {
    /// Creates a new FFmpeg converter with the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        Self {
            config,
            policy: Arc::new(LinearQualityPolicy::default()),
        }
    }

    /// Creates a converter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    /// Replaces the quality to CRF mapping.
    pub fn with_policy(mut self, policy: impl QualityPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    fn validate_parameters(job: &JobDescriptor) -> Result<(), ConverterError> {
        if job.quality() > 100 {
            return Err(ConverterError::invalid_parameters(format!(
                "quality must be between 0 and 100, got {}",
                job.quality()
            )));
        }
        if job.scale_percent() == 0 {
            return Err(ConverterError::invalid_parameters(
                "scale must be a positive percentage",
            ));
        }
        Ok(())
    }

    /// Runs one engine invocation and waits for it to exit.
    ///
    /// The child is killed if the timeout fires or the future is dropped.
    async fn run_engine(&self, args: &[String]) -> Result<(), ConverterError> {
        debug!(engine = ?self.config.ffmpeg_path, ?args, "Invoking engine");

        let child = Command::new(&self.config.ffmpeg_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::EngineNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let output = match timeout(timeout_duration, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ConverterError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                })
            }
        };

        if output.status.success() {
            return Ok(());
        }

        let status = match output.status.code() {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };
        Err(ConverterError::EngineFailed {
            status,
            detail: stderr_tail(&output.stderr),
        })
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

#[async_trait]
impl Converter for FfmpegConverter {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn convert(
        &self,
        job: &JobDescriptor,
        scratch: &ScratchPair,
    ) -> Result<ConversionOutput, ConverterError> {
        let format = job
            .target_format()
            .map_err(|e| ConverterError::UnsupportedFormat { format: e.0 })?;
        Self::validate_parameters(job)?;

        let start = Instant::now();
        let plan = build_plan(
            &self.config,
            self.policy.as_ref(),
            format,
            job.quality(),
            job.scale_percent(),
            PlanPaths {
                input: &scratch.input,
                output: &scratch.output,
                palette: &scratch.palette,
            },
        );

        for args in &plan {
            self.run_engine(args).await?;
        }

        // The exit status alone is not trusted; the output must have content.
        let size_bytes = match tokio::fs::metadata(&scratch.output).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => meta.len(),
            _ => {
                return Err(ConverterError::EmptyOutput {
                    path: scratch.output.clone(),
                })
            }
        };

        Ok(ConversionOutput {
            format,
            output_path: scratch.output.clone(),
            size_bytes,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        let output = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::EngineNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(ConverterError::EngineFailed {
                status: format!("{}", output.status),
                detail: stderr_tail(&output.stderr),
            });
        }

        Ok(())
    }
}
