//! Trait definitions for the converter module.

use async_trait::async_trait;

use super::error::ConverterError;
use super::types::ConversionOutput;
use crate::job::{JobDescriptor, TargetFormat};
use crate::storage::ScratchPair;

/// Converts one staged input into the requested output format.
///
/// Implementations read `scratch.input` and write `scratch.output`. They never
/// retry and never touch paths outside the pair they were given.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Converts the job's staged input.
    async fn convert(
        &self,
        job: &JobDescriptor,
        scratch: &ScratchPair,
    ) -> Result<ConversionOutput, ConverterError>;

    /// Validates that the converter is properly configured and ready.
    async fn validate(&self) -> Result<(), ConverterError>;

    /// Returns the supported output formats.
    fn supported_output_formats(&self) -> &[TargetFormat] {
        &[TargetFormat::Gif, TargetFormat::Mp4, TargetFormat::Webm]
    }
}
