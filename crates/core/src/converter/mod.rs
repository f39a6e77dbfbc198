//! Converter module: the adapter around the external media engine.
//!
//! This module provides the `Converter` trait and an implementation backed by
//! the `ffmpeg` command line tool.
//!
//! # Features
//!
//! - GIF output with optional palette generation (inline or two-pass)
//! - MP4 (H.264/AAC) and WebM (VP9/Opus) output with CRF from a pluggable
//!   quality policy
//! - Percentage-based scaling with lanczos resampling
//! - Timeouts with the engine process killed on expiry
//! - Output verification: a missing or empty file is a failure even if the
//!   engine exited cleanly
//!
//! # Example
//!
//! ```ignore
//! use reelforge_core::converter::{Converter, ConverterConfig, FfmpegConverter};
//! use reelforge_core::job::JobDescriptor;
//!
//! let converter = FfmpegConverter::new(ConverterConfig::default());
//! converter.validate().await?;
//!
//! let job = JobDescriptor::new("clip.mp4", bytes, "gif", 80, 50);
//! let scratch = storage.acquire(job.original_name(), "gif");
//! storage.stage(scratch.pair(), job.payload()).await?;
//! let output = converter.convert(&job, scratch.pair()).await?;
//! println!("wrote {} bytes in {} ms", output.size_bytes, output.duration_ms);
//! scratch.release().await?;
//! ```

mod args;
mod config;
mod error;
mod ffmpeg;
mod traits;
mod types;

pub use args::{build_plan, CrfRange, LinearQualityPolicy, PlanPaths, QualityPolicy};
pub use config::{ConverterConfig, PaletteMode};
pub use error::ConverterError;
pub use ffmpeg::FfmpegConverter;
pub use traits::Converter;
pub use types::ConversionOutput;
