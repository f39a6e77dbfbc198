use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::batch::BatchConfig;
use crate::converter::{ConverterConfig, PaletteMode};
use crate::storage::StorageConfig;
use crate::sweeper::SweeperConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub sweeper: SweeperConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory with the browser UI, served for unmatched routes.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    /// How successful outputs are handed back to the client.
    #[serde(default)]
    pub delivery: DeliveryMode,
    /// Upper bound on a whole multipart request body.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Upper bound on any single uploaded file.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            delivery: DeliveryMode::default(),
            max_upload_bytes: default_max_upload_bytes(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_max_upload_bytes() -> usize {
    10 * default_max_file_bytes()
}

fn default_max_file_bytes() -> usize {
    100 * 1024 * 1024
}

/// Transport for converted files in the batch response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Publish to the downloads directory and return a URL.
    #[default]
    Link,
    /// Embed the bytes as a base64 `data:` URL.
    Inline,
}

/// Sanitized config for API responses (filesystem layout and raw engine
/// arguments left out)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: SanitizedServerConfig,
    pub converter: SanitizedConverterConfig,
    pub batch: BatchConfig,
    pub sweeper: SweeperConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedServerConfig {
    pub port: u16,
    pub delivery: DeliveryMode,
    pub max_upload_bytes: usize,
    pub max_file_bytes: usize,
}

/// Sanitized converter config (engine path reduced to its file name)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConverterConfig {
    pub engine: String,
    pub timeout_secs: u64,
    pub gif_fps: u32,
    pub gif_palette: PaletteMode,
    pub x264_preset: String,
    pub audio_bitrate_kbps: u32,
    pub extra_args_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let converter = &config.converter;
        Self {
            server: SanitizedServerConfig {
                port: config.server.port,
                delivery: config.server.delivery,
                max_upload_bytes: config.server.max_upload_bytes,
                max_file_bytes: config.server.max_file_bytes,
            },
            converter: SanitizedConverterConfig {
                engine: converter
                    .ffmpeg_path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "ffmpeg".to_string()),
                timeout_secs: converter.timeout_secs,
                gif_fps: converter.gif_fps,
                gif_palette: converter.gif_palette,
                x264_preset: converter.x264_preset.clone(),
                audio_bitrate_kbps: converter.audio_bitrate_kbps,
                extra_args_configured: !converter.extra_args.is_empty(),
            },
            batch: config.batch.clone(),
            sweeper: config.sweeper.clone(),
        }
    }
}
