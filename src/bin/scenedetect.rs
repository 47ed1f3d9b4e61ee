//! `scenedetect` binary: wires [`rust_scenedetect::cli`] argument parsing to
//! the detection pipeline and output projections.
//!
//! Each `detect-*` subcommand runs its own detector and prints the
//! resulting scene list. `list-scenes`, `save-images`, and `split-video`
//! need *some* scene list to act on and don't name a detector of their
//! own, so they fall back to the default content detector (threshold
//! 27.0) — matching PySceneDetect's own behavior when no detector is
//! given on the command line.

use std::path::PathBuf;
use std::process::Command as ProcessCommand;
use std::sync::Arc;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use rust_scenedetect::cli::{self, Cli, Command};
use rust_scenedetect::detectors::{AdaptiveDetector, ContentDetector, HashDetector, HistogramDetector, ThresholdDetector};
use rust_scenedetect::detectors::content::EdgeParams;
use rust_scenedetect::detectors::threshold::FadeDirection;
use rust_scenedetect::error::{Result, SceneDetectError};
use rust_scenedetect::output::{
    encode_and_write, export_scene_images, write_edl, write_html_report, write_otio, write_qp_file, write_scene_list_csv,
    HtmlReportOptions, ImageExportConfig, SceneListCsvOptions,
};
use rust_scenedetect::scene_manager::SceneManager;
use rust_scenedetect::timecode::Timecode;
use rust_scenedetect::{Detector, Framerate, FrameSource, Scene, StatsManager, VideoStream};

fn main() {
    let cli = Cli::parse();
    rust_scenedetect::init_tracing(cli.verbosity.as_filter_str());

    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = cli::resolve_config(cli.config.as_ref(), false)?;
    let input_path = cli.input.to_string_lossy().to_string();

    let source = VideoStream::open(&input_path)?;
    let fps = source.framerate();

    let stats = cli.stats.as_ref().map(|_| Arc::new(StatsManager::new()));
    if let (Some(path), Some(stats)) = (cli.stats.as_ref(), stats.as_ref()) {
        if path.exists() {
            stats.load_csv(path, fps)?;
            info!("Loaded stats cache from {}", path.display());
        }
    }

    let min_scene_len_text = cli.min_scene_len.clone().unwrap_or_else(|| config.get_str("global", "min-scene-len", "0.6s"));
    let min_scene_len = Timecode::from_string(&min_scene_len_text, fps)?.to_frames();
    let assembly = cli::resolve_assembly_config(&cli, &config, min_scene_len);
    let mut manager_config = cli::resolve_scene_manager_config(assembly);
    manager_config.start = parse_opt_timecode(cli.start.as_deref(), fps)?;
    manager_config.end = parse_opt_timecode(cli.end.as_deref(), fps)?;
    manager_config.duration = parse_opt_timecode(cli.duration.as_deref(), fps)?;

    let mut manager = SceneManager::new(manager_config);
    if let Some(stats) = stats.clone() {
        manager.set_stats_manager(stats);
    }
    manager.add_detector(build_detector(&cli.command, &config)?);

    let total_frames = source.frame_count().max(1) as u64;
    let bar = ProgressBar::new(total_frames);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let scenes = manager.detect_scenes(source, |timecode| {
        bar.set_position(timecode.frame_number() as u64);
    })?;
    bar.finish_and_clear();

    info!("Detected {} scene(s)", scenes.len());

    if let (Some(path), Some(stats)) = (cli.stats.as_ref(), stats.as_ref()) {
        stats.save_csv(path, fps)?;
        info!("Saved stats cache to {}", path.display());
    }

    dispatch_output(&cli.command, &scenes, &input_path, &config)
}

fn build_detector(command: &Command, config: &rust_scenedetect::Config) -> Result<Box<dyn Detector + Send>> {
    let detector: Box<dyn Detector + Send> = match command {
        Command::DetectContent { threshold, luma_only } => {
            let weights = cli::resolve_content_weights(*luma_only);
            let min_scene_len = config.get_u32("detect-content", "min-scene-len", 15);
            Box::new(ContentDetector::with_config(
                *threshold,
                weights,
                EdgeParams::default(),
                min_scene_len,
                cli::default_content_filter_mode(),
            )?)
        }
        Command::DetectAdaptive { threshold, min_content_val, frame_window } => {
            Box::new(AdaptiveDetector::with_config(*frame_window, *threshold, *min_content_val, Default::default(), EdgeParams::default())?)
        }
        Command::DetectThreshold { threshold, fade_bias, add_last_scene } => {
            Box::new(ThresholdDetector::with_config(*threshold, FadeDirection::Floor, *fade_bias, *add_last_scene)?)
        }
        Command::DetectHist { threshold, bins } => Box::new(HistogramDetector::with_config(*bins, *threshold)?),
        Command::DetectHash { size, threshold } => Box::new(HashDetector::with_config(*size, 2, *threshold)?),
        // These three act on a scene list rather than detecting with a
        // detector of their own; fall back to the content detector's
        // built-in defaults, same as PySceneDetect does when no
        // `detect-*` command precedes them.
        Command::ListScenes { .. } | Command::SaveImages { .. } | Command::SplitVideo { .. } => Box::new(ContentDetector::new(27.0)?),
    };
    Ok(detector)
}

fn dispatch_output(command: &Command, scenes: &[Scene], input_path: &str, _config: &rust_scenedetect::Config) -> Result<()> {
    let video_name = video_stem(input_path);
    let cuts: Vec<_> = scenes.iter().skip(1).map(|scene| rust_scenedetect::Cut(scene.start)).collect();

    match command {
        Command::DetectContent { .. }
        | Command::DetectAdaptive { .. }
        | Command::DetectThreshold { .. }
        | Command::DetectHist { .. }
        | Command::DetectHash { .. } => {
            let default_path = PathBuf::from(format!("{video_name}-Scenes.csv"));
            write_scene_list_csv(scenes, &cuts, &default_path, SceneListCsvOptions::default())?;
            info!("Wrote scene list to {}", default_path.display());
            Ok(())
        }
        Command::ListScenes { output, skip_cuts } => {
            write_scene_list_csv(scenes, &cuts, output, SceneListCsvOptions { skip_cuts: *skip_cuts })?;
            info!("Wrote scene list to {}", output.display());
            Ok(())
        }
        Command::SaveImages { num_images, output_dir, format } => {
            std::fs::create_dir_all(output_dir).map_err(SceneDetectError::from)?;
            let export_config = ImageExportConfig {
                num_images: *num_images,
                output_dir: output_dir.clone(),
                format: (*format).into(),
                ..ImageExportConfig::default()
            };
            save_scene_images(scenes, input_path, &video_name, &export_config)
        }
        Command::SplitVideo { output_dir } => split_video(scenes, input_path, output_dir),
    }
    .and_then(|()| write_default_reports(scenes, &cuts, &video_name))
}

/// Besides the CSV/image outputs above, always emit an HTML report, an
/// EDL, an OTIO timeline, and a QP file next to the input, matching
/// PySceneDetect's "produce everything useful" default run.
fn write_default_reports(scenes: &[Scene], cuts: &[rust_scenedetect::Cut], video_name: &str) -> Result<()> {
    write_html_report(scenes, &HtmlReportOptions { thumbnails: None, title: video_name.to_string() }, format!("{video_name}-Scenes.html"))?;
    write_edl(scenes, video_name, format!("{video_name}.edl"))?;
    write_otio(scenes, video_name, format!("{video_name}.otio"))?;
    write_qp_file(cuts, format!("{video_name}.qp"))?;
    Ok(())
}

/// Schedule thumbnail picks, re-open the source for seekable reads, and
/// encode one image per pick. A second `VideoStream::open` is cheap next to
/// the decode pass that already ran and keeps frame retrieval for thumbnails
/// out of the hot detection loop.
fn save_scene_images(scenes: &[Scene], input_path: &str, video_name: &str, export_config: &ImageExportConfig) -> Result<()> {
    let picks = export_scene_images(scenes, export_config);
    let mut source = VideoStream::open(input_path)?;

    for pick in &picks {
        let scene = &scenes[pick.scene_index];
        let timecode = Timecode::from_frames(pick.frame_number, scene.start.fps());
        source.seek(timecode)?;
        let frame = source.read()?.ok_or_else(|| {
            SceneDetectError::internal_error(format!("end of stream while seeking frame {} for thumbnail export", pick.frame_number))
        })?;
        let path = encode_and_write(&frame, video_name, *pick, export_config)?;
        info!("Wrote {}", path.display());
    }

    Ok(())
}

/// Thin wrapper around `ffmpeg`, not a re-implementation of video muxing.
fn split_video(scenes: &[Scene], input_path: &str, output_dir: &std::path::Path) -> Result<()> {
    std::fs::create_dir_all(output_dir).map_err(SceneDetectError::from)?;
    let video_name = video_stem(input_path);

    for (i, scene) in scenes.iter().enumerate() {
        let output_path = output_dir.join(format!("{video_name}-Scene-{:03}.mp4", i + 1));
        let status = ProcessCommand::new("ffmpeg")
            .args([
                "-y",
                "-i",
                input_path,
                "-ss",
                &scene.start.to_string_timecode(),
                "-to",
                &scene.end.to_string_timecode(),
                "-c",
                "copy",
            ])
            .arg(&output_path)
            .status()
            .map_err(|e| SceneDetectError::internal_error(format!("failed to spawn ffmpeg: {e}")))?;

        if !status.success() {
            return Err(SceneDetectError::internal_error(format!("ffmpeg exited with status {status} for scene {}", i + 1)));
        }
        info!("Wrote {}", output_path.display());
    }
    Ok(())
}

fn video_stem(input_path: &str) -> String {
    std::path::Path::new(input_path).file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_else(|| "video".to_string())
}

fn parse_opt_timecode(text: Option<&str>, fps: Framerate) -> Result<Option<Timecode>> {
    text.map(|text| Timecode::from_string(text, fps)).transpose()
}
