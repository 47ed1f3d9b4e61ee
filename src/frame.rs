//! The `Frame` type: an immutable, BGR-ordered view of one decoded picture.
//!
//! Channel order is BGR by contract (matching OpenCV's native layout, which
//! is what [`crate::video_stream::VideoStream`] already reads frames in) —
//! detectors read pixels by raw offset, so this is load-bearing, not an
//! implementation accident.

use opencv::{core, core::Mat, imgproc, prelude::*};
use tracing::instrument;

use crate::error::{Result, SceneDetectError};
use crate::timecode::Timecode;

/// A decoded video frame at a known presentation time.
///
/// Frames are cheap to clone (the underlying `Mat` is refcounted by
/// OpenCV), but detectors must not retain a `Frame` past the
/// `process_frame` call that handed it to them — see the `Detector`
/// contract in `crate::detector`.
#[derive(Clone)]
pub struct Frame {
    mat: Mat,
    timecode: Timecode,
}

impl Frame {
    /// Wrap a decoded BGR `Mat` with its presentation timecode.
    pub fn new(mat: Mat, timecode: Timecode) -> Result<Self> {
        if mat.empty() {
            return Err(SceneDetectError::frame_error(timecode.frame_number(), "empty frame"));
        }
        Ok(Self { mat, timecode })
    }

    pub fn width(&self) -> i32 {
        self.mat.cols()
    }

    pub fn height(&self) -> i32 {
        self.mat.rows()
    }

    pub fn timecode(&self) -> Timecode {
        self.timecode
    }

    /// The raw BGR pixel buffer, for detectors that need direct access.
    pub fn mat(&self) -> &Mat {
        &self.mat
    }

    /// Crop to a rectangle `(x, y, width, height)` given in source pixels.
    #[instrument(skip(self))]
    pub fn crop(&self, x: i32, y: i32, width: i32, height: i32) -> Result<Self> {
        let rect = core::Rect::new(x, y, width, height);
        let cropped = Mat::roi(&self.mat, rect)
            .map_err(|e| SceneDetectError::frame_error(self.timecode.frame_number(), format!("crop failed: {e}")))?;
        // Force a deep copy so the cropped Frame does not keep the parent
        // Mat's full allocation alive.
        let mut owned = Mat::default();
        cropped
            .copy_to(&mut owned)
            .map_err(|e| SceneDetectError::frame_error(self.timecode.frame_number(), format!("crop copy failed: {e}")))?;
        Self::new(owned, self.timecode)
    }

    /// Downscale so the larger dimension is at most `max_dimension`,
    /// matching PySceneDetect's `auto` downscale factor selection.
    #[instrument(skip(self))]
    pub fn downscale(&self, factor: DownscaleFactor, method: DownscaleMethod) -> Result<Self> {
        let factor = match factor {
            DownscaleFactor::Explicit(f) => f.max(1),
            DownscaleFactor::Auto { max_dimension } => {
                let larger = self.width().max(self.height());
                ((larger as f64 / max_dimension as f64).ceil() as i32).max(1)
            }
        };

        if factor <= 1 {
            return Ok(self.clone());
        }

        let new_width = (self.width() / factor).max(1);
        let new_height = (self.height() / factor).max(1);
        let interpolation = match method {
            DownscaleMethod::NearestNeighbor => imgproc::INTER_NEAREST,
            DownscaleMethod::Bilinear => imgproc::INTER_LINEAR,
        };

        let mut resized = Mat::default();
        imgproc::resize(
            &self.mat,
            &mut resized,
            core::Size::new(new_width, new_height),
            0.0,
            0.0,
            interpolation,
        )
        .map_err(|e| SceneDetectError::frame_error(self.timecode.frame_number(), format!("downscale failed: {e}")))?;

        Self::new(resized, self.timecode)
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("frame_number", &self.timecode.frame_number())
            .finish()
    }
}

/// How much to shrink a frame before handing it to detectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DownscaleFactor {
    /// Divide both dimensions by this integer factor (>= 1).
    Explicit(i32),
    /// Choose the smallest integer factor so the larger dimension is <=
    /// `max_dimension`.
    Auto { max_dimension: i32 },
}

impl Default for DownscaleFactor {
    fn default() -> Self {
        DownscaleFactor::Auto { max_dimension: 400 }
    }
}

/// Resampling method used when downscaling. Nearest-neighbor is the
/// historical PySceneDetect default (cheapest); bilinear trades CPU for
/// more stable edge-detection scores under camera motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownscaleMethod {
    #[default]
    NearestNeighbor,
    Bilinear,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timecode::Framerate;
    use opencv::core::{Scalar, CV_8UC3};

    fn solid_frame(width: i32, height: i32, color: (u8, u8, u8)) -> Frame {
        let mat = Mat::new_rows_cols_with_default(
            height,
            width,
            CV_8UC3,
            Scalar::from((color.0 as f64, color.1 as f64, color.2 as f64)),
        )
        .unwrap();
        let tc = Timecode::from_frames(1, Framerate::new(30, 1));
        Frame::new(mat, tc).unwrap()
    }

    #[test]
    fn test_frame_dimensions() {
        let frame = solid_frame(64, 48, (10, 20, 30));
        assert_eq!(frame.width(), 64);
        assert_eq!(frame.height(), 48);
    }

    #[test]
    fn test_downscale_auto() {
        let frame = solid_frame(800, 400, (0, 0, 0));
        let small = frame.downscale(DownscaleFactor::Auto { max_dimension: 400 }, DownscaleMethod::NearestNeighbor).unwrap();
        assert!(small.width() <= 400 && small.height() <= 400);
    }

    #[test]
    fn test_downscale_explicit_noop_below_two() {
        let frame = solid_frame(64, 48, (1, 2, 3));
        let same = frame.downscale(DownscaleFactor::Explicit(1), DownscaleMethod::NearestNeighbor).unwrap();
        assert_eq!(same.width(), 64);
        assert_eq!(same.height(), 48);
    }

    #[test]
    fn test_crop() {
        let frame = solid_frame(100, 100, (5, 5, 5));
        let cropped = frame.crop(10, 10, 50, 40).unwrap();
        assert_eq!(cropped.width(), 50);
        assert_eq!(cropped.height(), 40);
    }
}
