//! Configuration for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How GIF output gets its color palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaletteMode {
    /// Let the GIF muxer use its default palette.
    Off,
    /// Generate and apply the palette inside one filter graph.
    Inline,
    /// Write the palette to scratch space first, then encode with it.
    TwoPass,
}

/// Configuration for the FFmpeg-based converter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Timeout for a single engine invocation in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Frame rate of GIF output.
    #[serde(default = "default_gif_fps")]
    pub gif_fps: u32,

    /// Palette strategy for GIF output.
    #[serde(default = "default_gif_palette")]
    pub gif_palette: PaletteMode,

    /// x264 preset for MP4 output.
    #[serde(default = "default_x264_preset")]
    pub x264_preset: String,

    /// Audio bitrate for MP4 and WebM output.
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate_kbps: u32,

    /// Additional arguments inserted before the output path.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_timeout() -> u64 {
    600
}

fn default_log_level() -> String {
    "error".to_string()
}

fn default_gif_fps() -> u32 {
    12
}

fn default_gif_palette() -> PaletteMode {
    PaletteMode::TwoPass
}

fn default_x264_preset() -> String {
    "medium".to_string()
}

fn default_audio_bitrate() -> u32 {
    128
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            timeout_secs: default_timeout(),
            log_level: default_log_level(),
            gif_fps: default_gif_fps(),
            gif_palette: default_gif_palette(),
            x264_preset: default_x264_preset(),
            audio_bitrate_kbps: default_audio_bitrate(),
            extra_args: Vec::new(),
        }
    }
}

impl ConverterConfig {
    /// Creates a config pointing at a specific ffmpeg binary.
    pub fn with_ffmpeg_path(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ..Default::default()
        }
    }

    /// Sets the timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Sets the GIF palette mode.
    pub fn with_gif_palette(mut self, mode: PaletteMode) -> Self {
        self.gif_palette = mode;
        self
    }
}
