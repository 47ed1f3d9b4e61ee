//! Shared command-line surface for the `scenedetect` binary.
//!
//! Generalizes the original hand-rolled argument parser to `clap`'s derive
//! API, the way `av-scenechange` gates a CLI behind an optional `binary`
//! feature + `[[bin]]` target. This module only defines the argument
//! schema and small config-resolution helpers; `src/bin/scenedetect.rs`
//! owns the actual dispatch loop so this stays testable without an
//! OpenCV-backed video file.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::Config;
use crate::detectors::content::ComponentWeights;
use crate::flash_filter::FilterMode as DetectorFilterMode;
use crate::frame::{DownscaleFactor, DownscaleMethod};
use crate::scene::AssemblyConfig;
use crate::scene_manager::SceneManagerConfig;

/// Top-level CLI, mirroring PySceneDetect's `scenedetect` entry point.
#[derive(Debug, Parser)]
#[command(name = "scenedetect", version, about = "Detect scene boundaries in a video")]
pub struct Cli {
    /// Input video file.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Path to an INI-style configuration file. Defaults to the
    /// platform config directory if not given and a file exists there.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Stats CSV path: loaded before detection if present, saved after.
    #[arg(long)]
    pub stats: Option<PathBuf>,

    /// Minimum scene length, as a timecode string ("15", "0.6s", "00:00:01").
    #[arg(long)]
    pub min_scene_len: Option<String>,

    #[arg(long)]
    pub drop_short_scenes: bool,

    #[arg(long)]
    pub merge_last_scene: bool,

    /// Start of the processed range, as a timecode string.
    #[arg(long)]
    pub start: Option<String>,

    /// End of the processed range, as a timecode string.
    #[arg(long)]
    pub end: Option<String>,

    /// Duration of the processed range, as a timecode string.
    #[arg(long)]
    pub duration: Option<String>,

    /// Logging verbosity.
    #[arg(short, long, value_enum, default_value_t = Verbosity::Info)]
    pub verbosity: Verbosity,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Verbosity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Verbosity {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            Verbosity::Trace => "trace",
            Verbosity::Debug => "debug",
            Verbosity::Info => "info",
            Verbosity::Warn => "warn",
            Verbosity::Error => "error",
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Content-aware detector (HSV + edges).
    DetectContent {
        #[arg(long, default_value_t = 27.0)]
        threshold: f64,
        #[arg(long)]
        luma_only: bool,
    },
    /// Adaptive detector (content_val relative to a rolling mean).
    DetectAdaptive {
        #[arg(long, default_value_t = 3.0)]
        threshold: f64,
        #[arg(long, default_value_t = 15.0)]
        min_content_val: f64,
        #[arg(long, default_value_t = 2)]
        frame_window: u32,
    },
    /// Fade-to-black/white threshold detector.
    DetectThreshold {
        #[arg(long, default_value_t = 12.0)]
        threshold: f64,
        #[arg(long, default_value_t = 0.0)]
        fade_bias: f64,
        #[arg(long, default_value_t = true)]
        add_last_scene: bool,
    },
    /// Y'CbCr luma histogram correlation detector.
    DetectHist {
        #[arg(long, default_value_t = 0.05)]
        threshold: f64,
        #[arg(long, default_value_t = 256)]
        bins: i32,
    },
    /// Perceptual-hash (DCT) detector.
    DetectHash {
        #[arg(long, default_value_t = 16)]
        size: u32,
        #[arg(long)]
        threshold: Option<u32>,
    },
    /// Write the scene list to a CSV file without re-detecting.
    ListScenes {
        #[arg(long, default_value = "scenes.csv")]
        output: PathBuf,
        #[arg(long)]
        skip_cuts: bool,
    },
    /// Export evenly-spaced thumbnail images per scene.
    SaveImages {
        #[arg(long, default_value_t = 3)]
        num_images: u32,
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
        #[arg(long, value_enum, default_value_t = ImageFormatArg::Jpeg)]
        format: ImageFormatArg,
    },
    /// Split the input into per-scene clips via an external tool
    /// (thin wrapper; not reimplemented, see crate-level docs).
    SplitVideo {
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImageFormatArg {
    Jpeg,
    Png,
    Webp,
}

impl From<ImageFormatArg> for crate::output::ImageFormat {
    fn from(value: ImageFormatArg) -> Self {
        match value {
            ImageFormatArg::Jpeg => crate::output::ImageFormat::Jpeg,
            ImageFormatArg::Png => crate::output::ImageFormat::Png,
            ImageFormatArg::Webp => crate::output::ImageFormat::WebP,
        }
    }
}

/// Resolve the config file to load: an explicit `--config` wins, else the
/// platform default path is used if it exists, else an empty config (all
/// lookups fall through to built-in defaults).
pub fn resolve_config(explicit: Option<&PathBuf>, strict: bool) -> crate::error::Result<Config> {
    let path = explicit.cloned().or_else(Config::default_path);
    match path {
        Some(path) if path.exists() => Config::load(path, strict),
        _ => Ok(Config::empty()),
    }
}

/// Merge CLI-level scene-assembly options with a config file's `[global]`
/// section, respecting spec's precedence: CLI > config file > built-in
/// default. `min_scene_len_frames` is the value already converted from
/// whatever timecode string the CLI or config supplied, at the source's
/// framerate.
pub fn resolve_assembly_config(
    cli: &Cli,
    config: &Config,
    min_scene_len_frames: u32,
) -> AssemblyConfig {
    AssemblyConfig {
        min_scene_len: min_scene_len_frames,
        drop_short_scenes: cli.drop_short_scenes || config.get_bool("global", "drop-short-scenes", false),
        merge_last_scene: cli.merge_last_scene || config.get_bool("global", "merge-last-scene", false),
        start_in_scene: true,
    }
}

/// Build the pipeline-level config (downscale/crop/frame_skip are not yet
/// exposed on the CLI surface and keep their defaults).
pub fn resolve_scene_manager_config(assembly: AssemblyConfig) -> SceneManagerConfig {
    SceneManagerConfig {
        assembly,
        downscale: Some(DownscaleFactor::default()),
        downscale_method: DownscaleMethod::default(),
        ..SceneManagerConfig::default()
    }
}

/// Default component weights for `detect-content`, honoring `--luma-only`.
pub fn resolve_content_weights(luma_only: bool) -> ComponentWeights {
    if luma_only {
        ComponentWeights::luma_only()
    } else {
        ComponentWeights::default()
    }
}

/// The flash-filter mode `detect-content` uses; spec's default is `merge`.
pub fn default_content_filter_mode() -> DetectorFilterMode {
    DetectorFilterMode::Merge
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_config_falls_back_to_empty_when_missing() {
        let config = resolve_config(Some(&PathBuf::from("/nonexistent/path.cfg")), false).unwrap();
        assert_eq!(config.get_f64("detect-content", "threshold", 27.0), 27.0);
    }

    #[test]
    fn test_verbosity_filter_strings() {
        assert_eq!(Verbosity::Trace.as_filter_str(), "trace");
        assert_eq!(Verbosity::Error.as_filter_str(), "error");
    }

    #[test]
    fn test_resolve_content_weights_luma_only() {
        let weights = resolve_content_weights(true);
        assert_eq!(weights, ComponentWeights::luma_only());
    }
}
