//! Histogram detector: Y'CbCr luma histogram correlation, per spec §4.7.

use opencv::{
    core::{self, Mat, Vector},
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

pub const HIST_DIFF: MetricKey = MetricKey("hist_diff");

const METRIC_KEYS: [MetricKey; 1] = [HIST_DIFF];

/// Correlates each frame's luma histogram against the previous frame's;
/// a cut triggers when the Pearson correlation drops below `threshold`.
pub struct HistogramDetector {
    bins: i32,
    threshold: f64,
    last_histogram: Option<Mat>,
    frame_count: u32,
}

impl HistogramDetector {
    /// PySceneDetect defaults: `bins=256`, `threshold=0.05`.
    pub fn new(threshold: f64) -> Result<Self> {
        Self::with_config(256, threshold)
    }

    #[instrument]
    pub fn with_config(bins: i32, threshold: f64) -> Result<Self> {
        if bins <= 0 {
            return Err(SceneDetectError::config_error(format!("bins must be positive, got: {bins}")));
        }
        if !(-1.0..=1.0).contains(&threshold) {
            return Err(SceneDetectError::config_error(format!("threshold must be in [-1, 1], got: {threshold}")));
        }
        debug!("Created HistogramDetector: bins={}, threshold={}", bins, threshold);
        Ok(Self { bins, threshold, last_histogram: None, frame_count: 0 })
    }

    fn luma_histogram(&self, frame: &Frame) -> Result<Mat> {
        let mat = frame.mat();
        let mut ycrcb = Mat::default();
        imgproc::cvt_color_def(mat, &mut ycrcb, imgproc::COLOR_BGR2YCrCb)
            .map_err(|e| SceneDetectError::frame_error(frame.timecode().frame_number(), format!("YCrCb conversion failed: {e}")))?;

        let mut channels = Vector::<Mat>::new();
        core::split(&ycrcb, &mut channels)
            .map_err(|e| SceneDetectError::frame_error(frame.timecode().frame_number(), format!("channel split failed: {e}")))?;
        let luma = channels.get(0)?;

        let images: Vector<Mat> = Vector::from_iter([luma]);
        let channels_idx = Vector::from_slice(&[0]);
        let hist_size = Vector::from_slice(&[self.bins]);
        let ranges = Vector::from_slice(&[0.0f32, 256.0f32]);
        let mut hist = Mat::default();
        imgproc::calc_hist(
            &images,
            &channels_idx,
            &core::no_array(),
            &mut hist,
            &hist_size,
            &ranges,
            false,
        )
        .map_err(|e| SceneDetectError::frame_error(frame.timecode().frame_number(), format!("histogram failed: {e}")))?;

        let mut normalized = Mat::default();
        core::normalize(&hist, &mut normalized, 1.0, 0.0, core::NORM_L1, -1, &core::no_array())
            .map_err(|e| SceneDetectError::frame_error(frame.timecode().frame_number(), format!("normalize failed: {e}")))?;

        Ok(normalized)
    }
}

impl std::fmt::Debug for HistogramDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistogramDetector").field("bins", &self.bins).field("threshold", &self.threshold).finish()
    }
}

impl Detector for HistogramDetector {
    fn name(&self) -> &'static str {
        "histogram"
    }

    fn metric_keys(&self) -> &'static [MetricKey] {
        &METRIC_KEYS
    }

    #[instrument(skip(self, frame, stats))]
    fn process_frame(&mut self, timecode: Timecode, frame: &Frame, stats: Option<&StatsManager>) -> Result<Vec<Cut>> {
        self.frame_count += 1;
        let histogram = self.luma_histogram(frame)?;

        let correlation = if let Some(ref last) = self.last_histogram {
            imgproc::compare_hist(&histogram, last, imgproc::HISTCMP_CORREL)
                .map_err(|e| SceneDetectError::frame_error(timecode.frame_number(), format!("histogram compare failed: {e}")))?
        } else {
            1.0
        };

        trace!("Frame {} hist correlation={:.4}", timecode.frame_number(), correlation);

        if let Some(stats) = stats {
            stats.register_metric_keys(&METRIC_KEYS);
            stats.set_metrics(timecode, &[(HIST_DIFF, correlation)]);
        }

        self.last_histogram = Some(histogram);

        if correlation < self.threshold {
            debug!("Histogram cut at frame {} (correlation={:.4})", timecode.frame_number(), correlation);
            Ok(vec![Cut(timecode)])
        } else {
            Ok(Vec::new())
        }
    }

    fn reset(&mut self) {
        self.last_histogram = None;
        self.frame_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timecode::Framerate;
    use opencv::core::{Mat, Scalar, CV_8UC3};

    fn solid_frame(frame_number: u32, color: (u8, u8, u8)) -> Frame {
        let mat = Mat::new_rows_cols_with_default(32, 32, CV_8UC3, Scalar::from((color.0 as f64, color.1 as f64, color.2 as f64))).unwrap();
        Frame::new(mat, Timecode::from_frames(frame_number, Framerate::new(30, 1))).unwrap()
    }

    #[test]
    fn test_histogram_detector_creation() {
        let detector = HistogramDetector::new(0.05).unwrap();
        assert_eq!(detector.bins, 256);
    }

    #[test]
    fn test_invalid_bins_rejected() {
        let err = HistogramDetector::with_config(0, 0.05).unwrap_err();
        assert!(matches!(err, SceneDetectError::InvalidConfig { .. }));
    }

    #[test]
    fn test_first_frame_no_cut() {
        let mut detector = HistogramDetector::new(0.05).unwrap();
        let frame = solid_frame(1, (10, 20, 30));
        assert!(detector.process_frame(frame.timecode(), &frame, None).unwrap().is_empty());
    }

    #[test]
    fn test_large_color_change_triggers_cut() {
        let mut detector = HistogramDetector::new(0.5).unwrap();
        let f1 = solid_frame(1, (0, 0, 0));
        let f2 = solid_frame(2, (255, 255, 255));
        detector.process_frame(f1.timecode(), &f1, None).unwrap();
        let cuts = detector.process_frame(f2.timecode(), &f2, None).unwrap();
        assert_eq!(cuts.len(), 1);
    }
}
