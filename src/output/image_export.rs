//! Scene thumbnail export: evenly spaced frame picks per scene, filename
//! templating, resize, and JPEG/PNG/WebP encoding.
//!
//! Scheduling and encoding are split from frame retrieval: [`schedule_picks`]
//! decides *which* frame numbers to capture given only scene boundaries, so
//! it can be unit tested without decoding video; the caller (the CLI's
//! `save-images` subcommand) is responsible for seeking a [`crate::frame_source::FrameSource`]
//! to each picked frame and handing the resulting [`crate::frame::Frame`] to
//! [`encode_and_write`].

use std::path::PathBuf;

use image::{ImageBuffer, Rgb};
use opencv::prelude::*;
use tracing::{debug, instrument};

use crate::error::{Result, SceneDetectError};
use crate::frame::Frame;
use crate::scene::Scene;
use crate::timecode::Timecode;

/// Target encoding for exported thumbnails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
}

impl ImageFormat {
    fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::WebP => "webp",
        }
    }

    fn as_image_crate_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::WebP => image::ImageFormat::WebP,
        }
    }
}

/// How to resize a captured frame before encoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeSpec {
    Native,
    Scale(f64),
    Explicit { width: u32, height: u32 },
}

/// Export configuration shared across all picks in a job.
#[derive(Debug, Clone)]
pub struct ImageExportConfig {
    pub num_images: u32,
    /// Frames to keep clear of each scene boundary when distributing picks.
    pub frame_margin: u32,
    pub format: ImageFormat,
    pub resize: ResizeSpec,
    pub output_dir: PathBuf,
    /// Filename template; recognized placeholders: `$VIDEO_NAME`,
    /// `$SCENE_NUMBER`, `$IMAGE_NUMBER`, `$FRAME_NUMBER`, `$TIMECODE`,
    /// `$TIMESTAMP_MS`.
    pub filename_template: String,
}

impl Default for ImageExportConfig {
    fn default() -> Self {
        Self {
            num_images: 3,
            frame_margin: 1,
            format: ImageFormat::Jpeg,
            resize: ResizeSpec::Native,
            output_dir: PathBuf::from("."),
            filename_template: "$VIDEO_NAME-Scene-$SCENE_NUMBER-$IMAGE_NUMBER".to_string(),
        }
    }
}

/// One scheduled thumbnail capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledPick {
    pub scene_index: usize,
    pub image_number: u32,
    pub frame_number: u32,
}

/// Compute the frame numbers to capture for one scene: `n` picks evenly
/// spaced across `[start + margin, end - 1 - margin]`, clamped so a short
/// scene still yields at least one pick (the scene's midpoint).
pub fn schedule_picks(scenes: &[Scene], num_images: u32, frame_margin: u32) -> Vec<ScheduledPick> {
    let mut picks = Vec::new();
    for (scene_index, scene) in scenes.iter().enumerate() {
        let last_frame = scene.end.to_frames().saturating_sub(1);
        let start = scene.start.to_frames().saturating_add(frame_margin).min(last_frame);
        let end = last_frame.saturating_sub(frame_margin).max(start);

        let n = num_images.max(1);
        for i in 0..n {
            let frame_number = if n == 1 {
                (start + end) / 2
            } else {
                start + ((end - start) * i) / (n - 1)
            };
            picks.push(ScheduledPick { scene_index, image_number: i + 1, frame_number });
        }
    }
    picks
}

/// Render a filename from the template, without extension (callers append
/// the format's extension).
pub fn render_filename(template: &str, video_name: &str, pick: ScheduledPick, timecode: Timecode) -> String {
    template
        .replace("$VIDEO_NAME", video_name)
        .replace("$SCENE_NUMBER", &format!("{:03}", pick.scene_index + 1))
        .replace("$IMAGE_NUMBER", &format!("{:02}", pick.image_number))
        .replace("$FRAME_NUMBER", &pick.frame_number.to_string())
        .replace("$TIMECODE", &timecode.to_string_timecode().replace(':', "-"))
        .replace("$TIMESTAMP_MS", &((timecode.to_seconds() * 1000.0).round() as u64).to_string())
}

fn frame_to_rgb_image(frame: &Frame) -> Result<ImageBuffer<Rgb<u8>, Vec<u8>>> {
    let mat = frame.mat();
    let width = frame.width() as u32;
    let height = frame.height() as u32;
    let bytes = mat.data_bytes().map_err(SceneDetectError::from)?;

    let channels = mat.channels().max(1) as usize;
    let mut rgb = Vec::with_capacity((width * height) as usize * 3);
    for pixel in bytes.chunks_exact(channels) {
        // Mat is BGR by contract; image::Rgb wants RGB order.
        rgb.push(pixel[2]);
        rgb.push(pixel[1]);
        rgb.push(pixel[0]);
    }

    ImageBuffer::from_raw(width, height, rgb)
        .ok_or_else(|| SceneDetectError::frame_error(frame.timecode().frame_number(), "pixel buffer size mismatch"))
}

fn apply_resize(image: ImageBuffer<Rgb<u8>, Vec<u8>>, spec: ResizeSpec) -> ImageBuffer<Rgb<u8>, Vec<u8>> {
    match spec {
        ResizeSpec::Native => image,
        ResizeSpec::Scale(factor) => {
            let (w, h) = image.dimensions();
            let new_w = ((w as f64) * factor).round().max(1.0) as u32;
            let new_h = ((h as f64) * factor).round().max(1.0) as u32;
            image::imageops::resize(&image, new_w, new_h, image::imageops::FilterType::Lanczos3)
        }
        ResizeSpec::Explicit { width, height } => {
            image::imageops::resize(&image, width, height, image::imageops::FilterType::Lanczos3)
        }
    }
}

/// Resize and encode a single captured frame to `output_dir/<filename>.<ext>`.
/// Called on the calling thread after detection completes, off the hot
/// decode/detect loop.
#[instrument(skip(frame, config))]
pub fn encode_and_write(
    frame: &Frame,
    video_name: &str,
    pick: ScheduledPick,
    config: &ImageExportConfig,
) -> Result<PathBuf> {
    let rgb = frame_to_rgb_image(frame)?;
    let resized = apply_resize(rgb, config.resize);

    let filename = render_filename(&config.filename_template, video_name, pick, frame.timecode());
    let path: PathBuf = config.output_dir.join(format!("{}.{}", filename, config.format.extension()));

    resized
        .save_with_format(&path, config.format.as_image_crate_format())
        .map_err(|e| SceneDetectError::internal_error(format!("image encode failed: {e}")))?;

    debug!("Wrote thumbnail {}", path.display());
    Ok(path)
}

/// Schedule and return the picks for a completed scene list; the caller
/// drives frame retrieval + `encode_and_write` per pick (kept out of this
/// function so it stays decode-free and unit-testable).
pub fn export_scene_images(scenes: &[Scene], config: &ImageExportConfig) -> Vec<ScheduledPick> {
    schedule_picks(scenes, config.num_images, config.frame_margin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timecode::Framerate;

    fn scene(start: u32, end: u32) -> Scene {
        let fps = Framerate::new(25, 1);
        Scene { start: Timecode::from_frames(start, fps), end: Timecode::from_frames(end, fps) }
    }

    #[test]
    fn test_schedule_picks_evenly_spaced() {
        let picks = schedule_picks(&[scene(1, 101)], 3, 0);
        assert_eq!(picks.len(), 3);
        assert_eq!(picks[0].frame_number, 1);
        assert_eq!(picks[2].frame_number, 100);
    }

    #[test]
    fn test_schedule_picks_single_image_is_midpoint() {
        let picks = schedule_picks(&[scene(1, 101)], 1, 0);
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].frame_number, 50);
    }

    #[test]
    fn test_schedule_picks_short_scene_does_not_panic() {
        let picks = schedule_picks(&[scene(1, 3)], 3, 5);
        assert_eq!(picks.len(), 3);
    }

    #[test]
    fn test_render_filename_substitutes_placeholders() {
        let pick = ScheduledPick { scene_index: 0, image_number: 1, frame_number: 42 };
        let tc = Timecode::from_frames(42, Framerate::new(25, 1));
        let name = render_filename("$VIDEO_NAME-Scene-$SCENE_NUMBER-$IMAGE_NUMBER", "clip", pick, tc);
        assert_eq!(name, "clip-Scene-001-01");
    }
}
