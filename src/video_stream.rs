//! Video stream handling using OpenCV backend.
//!
//! This module provides a wrapper around OpenCV's VideoCapture for consistent
//! video reading and frame processing, implementing the [`FrameSource`]
//! contract so the pipeline driver never needs to know it's talking to
//! OpenCV specifically.

use opencv::{core::Mat, prelude::*, videoio};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SceneDetectError};
use crate::frame::Frame;
use crate::frame_source::FrameSource;
use crate::timecode::{Framerate, Timecode};

/// Wrapper around OpenCV VideoCapture for consistent video reading.
///
/// This struct provides a safe, instrumented interface to OpenCV's video
/// reading capabilities, with proper error handling and logging.
pub struct VideoStream {
    cap: videoio::VideoCapture,
    fps: Framerate,
    frame_count: i32,
    current_frame: i32,
    width: i32,
    height: i32,
    path: String,
    consecutive_decode_failures: u32,
    max_consecutive_decode_failures: u32,
}

impl VideoStream {
    /// Open a video file for reading.
    ///
    /// # Errors
    /// * `VideoNotFound` - If the file doesn't exist
    /// * `VideoOpenFailed` - If OpenCV can't open the file
    /// * `InvalidVideoFormat` - If the video format is unsupported
    /// * `EmptyVideo` - If the video has no frames
    #[instrument(skip(path))]
    pub fn open(path: &str) -> Result<Self> {
        info!("Opening video stream: {}", path);

        if !Path::new(path).exists() {
            return Err(SceneDetectError::VideoNotFound { path: path.to_string() });
        }

        let cap = videoio::VideoCapture::from_file(path, videoio::CAP_ANY).map_err(|e| {
            warn!("Failed to create VideoCapture: {}", e);
            SceneDetectError::VideoOpenFailed { path: path.to_string() }
        })?;

        let is_opened = cap.is_opened().map_err(|e| {
            warn!("Failed to check if VideoCapture is opened: {}", e);
            SceneDetectError::VideoOpenFailed { path: path.to_string() }
        })?;

        if !is_opened {
            return Err(SceneDetectError::VideoOpenFailed { path: path.to_string() });
        }

        let fps_raw = cap.get(videoio::CAP_PROP_FPS).map_err(|e| {
            warn!("Failed to get video FPS: {}", e);
            SceneDetectError::InvalidVideoFormat { path: path.to_string() }
        })?;

        let frame_count = cap.get(videoio::CAP_PROP_FRAME_COUNT).map_err(|e| {
            warn!("Failed to get frame count: {}", e);
            SceneDetectError::InvalidVideoFormat { path: path.to_string() }
        })? as i32;

        let width = cap.get(videoio::CAP_PROP_FRAME_WIDTH).map_err(|e| {
            warn!("Failed to get frame width: {}", e);
            SceneDetectError::InvalidVideoFormat { path: path.to_string() }
        })? as i32;

        let height = cap.get(videoio::CAP_PROP_FRAME_HEIGHT).map_err(|e| {
            warn!("Failed to get frame height: {}", e);
            SceneDetectError::InvalidVideoFormat { path: path.to_string() }
        })? as i32;

        if fps_raw <= 0.0 {
            return Err(SceneDetectError::InvalidVideoFormat { path: path.to_string() });
        }
        if frame_count <= 0 {
            return Err(SceneDetectError::EmptyVideo);
        }
        if width <= 0 || height <= 0 {
            return Err(SceneDetectError::InvalidVideoFormat { path: path.to_string() });
        }

        info!(
            "Video opened successfully - FPS: {}, Frames: {}, Size: {}x{}",
            fps_raw, frame_count, width, height
        );

        Ok(Self {
            cap,
            fps: Framerate::from_f64(fps_raw),
            frame_count,
            current_frame: 0,
            width,
            height,
            path: path.to_string(),
            consecutive_decode_failures: 0,
            max_consecutive_decode_failures: 3,
        })
    }

    /// Configure the number of consecutive transient decode failures
    /// tolerated before they are escalated to a fatal error.
    pub fn set_max_consecutive_decode_failures(&mut self, max: u32) {
        self.max_consecutive_decode_failures = max;
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn frame_count(&self) -> i32 {
        self.frame_count
    }

    pub fn current_frame(&self) -> i32 {
        self.current_frame
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frame_count as f64 / self.fps.as_f64()
    }

    pub fn progress_percent(&self) -> f64 {
        if self.frame_count == 0 {
            100.0
        } else {
            (self.current_frame as f64 / self.frame_count as f64) * 100.0
        }
    }
}

impl FrameSource for VideoStream {
    fn framerate(&self) -> Framerate {
        self.fps
    }

    fn frame_size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn duration(&self) -> Option<Timecode> {
        Some(Timecode::from_frames(self.frame_count as u32, self.fps))
    }

    fn position(&self) -> Timecode {
        Timecode::from_frames(self.current_frame as u32 + 1, self.fps)
    }

    #[instrument(skip(self))]
    fn seek(&mut self, timecode: Timecode) -> Result<()> {
        let target_frame = timecode.frame_number().saturating_sub(1);
        self.cap
            .set(videoio::CAP_PROP_POS_FRAMES, target_frame as f64)
            .map_err(|e| SceneDetectError::frame_error(target_frame, format!("seek failed: {e}")))?;
        self.current_frame = target_frame as i32;
        Ok(())
    }

    #[instrument(skip(self))]
    fn read(&mut self) -> Result<Option<Frame>> {
        let mut mat = Mat::default();

        let success = self.cap.read(&mut mat).map_err(|e| SceneDetectError::DecodeError {
            frame: self.current_frame as u32,
            reason: format!("OpenCV read failed: {e}"),
        });

        let success = match success {
            Ok(success) => {
                self.consecutive_decode_failures = 0;
                success
            }
            Err(err) => {
                self.consecutive_decode_failures += 1;
                if self.consecutive_decode_failures >= self.max_consecutive_decode_failures {
                    return Err(SceneDetectError::PersistentDecodeFailure {
                        count: self.consecutive_decode_failures,
                    });
                }
                return Err(err);
            }
        };

        if success && !mat.empty() {
            self.current_frame += 1;
            debug!("Read frame {}/{}", self.current_frame, self.frame_count);

            let frame_rows = mat.rows();
            let frame_cols = mat.cols();
            if frame_rows != self.height || frame_cols != self.width {
                return Err(SceneDetectError::frame_error(
                    self.current_frame as u32,
                    format!(
                        "frame size mismatch: expected {}x{}, got {}x{}",
                        self.width, self.height, frame_cols, frame_rows
                    ),
                ));
            }

            let tc = Timecode::from_frames(self.current_frame as u32, self.fps);
            Ok(Some(Frame::new(mat, tc)?))
        } else {
            debug!("Reached end of video at frame {}", self.current_frame);
            Ok(None)
        }
    }
}

impl std::fmt::Debug for VideoStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoStream")
            .field("path", &self.path)
            .field("fps", &self.fps.as_f64())
            .field("frame_count", &self.frame_count)
            .field("current_frame", &self.current_frame)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

unsafe impl Send for VideoStream {}
unsafe impl Sync for VideoStream {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_stream_nonexistent_file() {
        let result = VideoStream::open("nonexistent_video.mp4");
        assert!(result.is_err());
        match result.unwrap_err() {
            SceneDetectError::VideoNotFound { path } => assert_eq!(path, "nonexistent_video.mp4"),
            other => panic!("Expected VideoNotFound, got: {:?}", other),
        }
    }

    #[test]
    fn test_video_stream_empty_path() {
        let result = VideoStream::open("");
        assert!(matches!(result.unwrap_err(), SceneDetectError::VideoNotFound { .. }));
    }

    #[test]
    fn test_video_stream_directory_instead_of_file() {
        let temp_dir = std::env::temp_dir().join("rust_scenedetect_test_dir");
        if temp_dir.exists() {
            std::fs::remove_dir_all(&temp_dir).ok();
        }
        std::fs::create_dir(&temp_dir).expect("failed to create test directory");

        let result = VideoStream::open(temp_dir.to_str().unwrap());
        std::fs::remove_dir_all(&temp_dir).ok();

        assert!(matches!(
            result.unwrap_err(),
            SceneDetectError::VideoOpenFailed { .. } | SceneDetectError::InvalidVideoFormat { .. }
        ));
    }
}
