//! Perceptual-hash detector: DCT-based frame hashing, per spec §4.8.

use opencv::{
    core::{self, Mat, CV_32F},
    imgproc,
    prelude::*,
};
use tracing::{debug, instrument, trace};

use crate::detector::{Detector, MetricKey};
use crate::error::{Result, SceneDetectError};
use crate::frame::Frame;
use crate::scene::Cut;
use crate::stats_manager::StatsManager;
use crate::timecode::Timecode;

pub const HASH_DIST: MetricKey = MetricKey("hash_dist");

const METRIC_KEYS: [MetricKey; 1] = [HASH_DIST];

/// Default Hamming-distance cut threshold for a given hash `size`,
/// roughly `size^2 * 1.5` rounded, matching PySceneDetect's size=16 ->
/// 395 reference point.
fn default_threshold_for_size(size: u32) -> u32 {
    ((size * size) as f64 * 1.543).round() as u32
}

/// Perceptual hash via 2-D DCT of the resized luma plane: keeps the
/// top-left `size x size` block (excluding DC), thresholds each
/// coefficient against the block median, and compares successive hashes
/// by Hamming distance.
pub struct HashDetector {
    size: u32,
    freq_factor: u32,
    threshold: u32,
    last_hash: Option<Vec<bool>>,
    frame_count: u32,
}

impl HashDetector {
    /// PySceneDetect defaults: `size=16`, `freq_factor=2`.
    pub fn new() -> Result<Self> {
        Self::with_config(16, 2, None)
    }

    #[instrument]
    pub fn with_config(size: u32, freq_factor: u32, threshold: Option<u32>) -> Result<Self> {
        if size == 0 {
            return Err(SceneDetectError::config_error("hash size must be positive"));
        }
        if freq_factor == 0 {
            return Err(SceneDetectError::config_error("freq_factor must be positive"));
        }
        let threshold = threshold.unwrap_or_else(|| default_threshold_for_size(size));

        debug!("Created HashDetector: size={}, freq_factor={}, threshold={}", size, freq_factor, threshold);

        Ok(Self { size, freq_factor, threshold, last_hash: None, frame_count: 0 })
    }

    fn compute_hash(&self, frame: &Frame) -> Result<Vec<bool>> {
        let mat = frame.mat();
        let mut gray = Mat::default();
        imgproc::cvt_color_def(mat, &mut gray, imgproc::COLOR_BGR2GRAY)
            .map_err(|e| SceneDetectError::frame_error(frame.timecode().frame_number(), format!("grayscale conversion failed: {e}")))?;

        let resized_dim = (self.size * self.freq_factor) as i32;
        let mut resized = Mat::default();
        imgproc::resize(&gray, &mut resized, core::Size::new(resized_dim, resized_dim), 0.0, 0.0, imgproc::INTER_LINEAR)
            .map_err(|e| SceneDetectError::frame_error(frame.timecode().frame_number(), format!("resize failed: {e}")))?;

        let mut float_mat = Mat::default();
        resized
            .convert_to(&mut float_mat, CV_32F, 1.0, 0.0)
            .map_err(|e| SceneDetectError::frame_error(frame.timecode().frame_number(), format!("float conversion failed: {e}")))?;

        let mut dct = Mat::default();
        core::dct(&float_mat, &mut dct, 0)
            .map_err(|e| SceneDetectError::frame_error(frame.timecode().frame_number(), format!("DCT failed: {e}")))?;

        let block =
            Mat::roi(&dct, core::Rect::new(0, 0, self.size as i32, self.size as i32)).map_err(SceneDetectError::from)?;

        let mut coefficients = Vec::with_capacity((self.size * self.size) as usize - 1);
        for row in 0..self.size as i32 {
            for col in 0..self.size as i32 {
                if row == 0 && col == 0 {
                    continue; // exclude DC coefficient
                }
                let value: f32 = *block.at_2d(row, col).map_err(SceneDetectError::from)?;
                coefficients.push(value);
            }
        }

        let mut sorted = coefficients.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let median = sorted[sorted.len() / 2];

        Ok(coefficients.into_iter().map(|v| v > median).collect())
    }

    fn hamming_distance(a: &[bool], b: &[bool]) -> u32 {
        a.iter().zip(b.iter()).filter(|(x, y)| x != y).count() as u32
    }
}

impl std::fmt::Debug for HashDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashDetector").field("size", &self.size).field("threshold", &self.threshold).finish()
    }
}

impl Detector for HashDetector {
    fn name(&self) -> &'static str {
        "hash"
    }

    fn metric_keys(&self) -> &'static [MetricKey] {
        &METRIC_KEYS
    }

    #[instrument(skip(self, frame, stats))]
    fn process_frame(&mut self, timecode: Timecode, frame: &Frame, stats: Option<&StatsManager>) -> Result<Vec<Cut>> {
        self.frame_count += 1;
        let hash = self.compute_hash(frame)?;

        let hash_dist = self.last_hash.as_ref().map(|last| Self::hamming_distance(&hash, last)).unwrap_or(0);

        trace!("Frame {} hash_dist={}", timecode.frame_number(), hash_dist);

        if let Some(stats) = stats {
            stats.register_metric_keys(&METRIC_KEYS);
            stats.set_metrics(timecode, &[(HASH_DIST, hash_dist as f64)]);
        }

        self.last_hash = Some(hash);

        if hash_dist > self.threshold {
            debug!("Hash cut at frame {} (hash_dist={})", timecode.frame_number(), hash_dist);
            Ok(vec![Cut(timecode)])
        } else {
            Ok(Vec::new())
        }
    }

    fn reset(&mut self) {
        self.last_hash = None;
        self.frame_count = 0;
    }
}
