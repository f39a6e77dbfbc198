//! Engine argument construction.
//!
//! Arguments are built as vectors and handed to the process directly, so
//! filenames are never interpolated into a shell string.

use std::fmt;
use std::path::Path;

use super::config::{ConverterConfig, PaletteMode};
use crate::job::TargetFormat;

/// Maps a 0-100 quality setting to an encoder CRF.
pub trait QualityPolicy: Send + Sync + fmt::Debug {
    /// Returns the CRF for `format`, or `None` if the format has no CRF knob.
    fn crf(&self, format: TargetFormat, quality: u8) -> Option<u8>;
}

/// Inclusive CRF bounds: `best` is used at quality 100, `worst` at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrfRange {
    pub best: u8,
    pub worst: u8,
}

/// Linear interpolation between per-codec CRF bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearQualityPolicy {
    pub h264: CrfRange,
    pub vp9: CrfRange,
}

impl Default for LinearQualityPolicy {
    fn default() -> Self {
        Self {
            h264: CrfRange { best: 18, worst: 35 },
            vp9: CrfRange { best: 15, worst: 50 },
        }
    }
}

impl LinearQualityPolicy {
    fn interpolate(range: CrfRange, quality: u8) -> u8 {
        let quality = f32::from(quality.min(100)) / 100.0;
        let span = f32::from(range.worst.saturating_sub(range.best));
        let crf = f32::from(range.worst) - span * quality;
        (crf.round() as u8).clamp(range.best, range.worst)
    }
}

impl QualityPolicy for LinearQualityPolicy {
    fn crf(&self, format: TargetFormat, quality: u8) -> Option<u8> {
        match format {
            TargetFormat::Gif => None,
            TargetFormat::Mp4 => Some(Self::interpolate(self.h264, quality)),
            TargetFormat::Webm => Some(Self::interpolate(self.vp9, quality)),
        }
    }
}

/// Paths an invocation plan reads from and writes to.
#[derive(Debug, Clone, Copy)]
pub struct PlanPaths<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub palette: &'a Path,
}

/// Builds the engine invocations for one job.
///
/// Most formats need a single pass; two-pass GIF encoding returns two.
pub fn build_plan(
    config: &ConverterConfig,
    policy: &dyn QualityPolicy,
    format: TargetFormat,
    quality: u8,
    scale_percent: u32,
    paths: PlanPaths<'_>,
) -> Vec<Vec<String>> {
    match format {
        TargetFormat::Gif => gif_plan(config, scale_percent, paths),
        TargetFormat::Mp4 | TargetFormat::Webm => {
            vec![video_args(config, policy, format, quality, scale_percent, paths)]
        }
    }
}

fn base_args(config: &ConverterConfig) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-nostdin".to_string(),
        "-y".to_string(),
        "-loglevel".to_string(),
        config.log_level.clone(),
    ]
}

fn push_input(args: &mut Vec<String>, path: &Path) {
    args.push("-i".to_string());
    args.push(path.to_string_lossy().to_string());
}

fn push_output(args: &mut Vec<String>, config: &ConverterConfig, muxer: &str, path: &Path) {
    args.extend(config.extra_args.iter().cloned());
    args.extend(["-f".to_string(), muxer.to_string()]);
    args.push(path.to_string_lossy().to_string());
}

// A computed width of 0 would make the scale filter keep the input width,
// so each expression is floored at the smallest valid width.

/// Scale filter for GIF output; any width of at least 1 is valid.
fn gif_scale(scale_percent: u32) -> String {
    format!(
        "scale=max(1\\,trunc(iw*{}/100)):-1:flags=lanczos",
        scale_percent
    )
}

/// Scale filter for yuv420p output, which needs even dimensions.
fn even_scale(scale_percent: u32) -> String {
    format!(
        "scale=max(2\\,trunc(iw*{}/200)*2):-2:flags=lanczos",
        scale_percent
    )
}

fn gif_plan(config: &ConverterConfig, scale_percent: u32, paths: PlanPaths<'_>) -> Vec<Vec<String>> {
    let prefix = format!("fps={},{}", config.gif_fps, gif_scale(scale_percent));

    match config.gif_palette {
        PaletteMode::Off => {
            let mut args = base_args(config);
            push_input(&mut args, paths.input);
            args.extend(["-vf".to_string(), prefix, "-an".to_string()]);
            push_output(&mut args, config, "gif", paths.output);
            vec![args]
        }
        PaletteMode::Inline => {
            let mut args = base_args(config);
            push_input(&mut args, paths.input);
            args.extend([
                "-vf".to_string(),
                format!("{},split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse", prefix),
                "-an".to_string(),
            ]);
            push_output(&mut args, config, "gif", paths.output);
            vec![args]
        }
        PaletteMode::TwoPass => {
            let mut palette_pass = base_args(config);
            push_input(&mut palette_pass, paths.input);
            palette_pass.extend([
                "-vf".to_string(),
                format!("{},palettegen", prefix),
                "-frames:v".to_string(),
                "1".to_string(),
                "-update".to_string(),
                "1".to_string(),
                "-f".to_string(),
                "image2".to_string(),
                paths.palette.to_string_lossy().to_string(),
            ]);

            let mut encode_pass = base_args(config);
            push_input(&mut encode_pass, paths.input);
            push_input(&mut encode_pass, paths.palette);
            encode_pass.extend([
                "-lavfi".to_string(),
                format!("{}[x];[x][1:v]paletteuse", prefix),
                "-an".to_string(),
            ]);
            push_output(&mut encode_pass, config, "gif", paths.output);

            vec![palette_pass, encode_pass]
        }
    }
}

fn video_args(
    config: &ConverterConfig,
    policy: &dyn QualityPolicy,
    format: TargetFormat,
    quality: u8,
    scale_percent: u32,
    paths: PlanPaths<'_>,
) -> Vec<String> {
    let mut args = base_args(config);
    push_input(&mut args, paths.input);
    args.extend(["-vf".to_string(), even_scale(scale_percent)]);

    let crf = policy.crf(format, quality).unwrap_or(23).to_string();
    let audio_bitrate = format!("{}k", config.audio_bitrate_kbps);

    match format {
        TargetFormat::Mp4 => args.extend([
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            config.x264_preset.clone(),
            "-crf".to_string(),
            crf,
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            audio_bitrate,
        ]),
        TargetFormat::Webm => args.extend([
            "-c:v".to_string(),
            "libvpx-vp9".to_string(),
            "-crf".to_string(),
            crf,
            "-b:v".to_string(),
            "0".to_string(),
            "-c:a".to_string(),
            "libopus".to_string(),
            "-b:a".to_string(),
            audio_bitrate,
        ]),
        TargetFormat::Gif => {}
    }

    push_output(&mut args, config, format.muxer(), paths.output);
    args
}
