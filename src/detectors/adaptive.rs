//! Adaptive detector: a content detector whose cut decision is relative to
//! a local rolling average rather than an absolute threshold, so it rides
//! out slow lighting drift without false-triggering.
//!
//! Per spec §4.5, a decision at display time `t` requires having observed
//! `W` frames beyond it, so this detector holds cuts back and reports
//! `event_buffer() = W`.

use std::collections::VecDeque;

use tracing::{debug, instrument, trace};

use crate::detector::{Detector, MetricKey};
use crate::detectors::content::{ComponentWeights, ContentDetector, EdgeParams};
use crate::error::Result;
use crate::flash_filter::FilterMode;
use crate::frame::Frame;
use crate::scene::Cut;
use crate::stats_manager::StatsManager;
use crate::timecode::Timecode;

pub const ADAPTIVE_RATIO: MetricKey = MetricKey("adaptive_ratio");

const METRIC_KEYS: [MetricKey; 1] = [ADAPTIVE_RATIO];

const EPSILON: f64 = 1e-6;

struct Sample {
    timecode: Timecode,
    content_val: f64,
}

/// Wraps [`ContentDetector`] and evaluates cuts against a `2W+1`-wide
/// rolling window of `content_val` samples centered on the candidate
/// frame.
pub struct AdaptiveDetector {
    content: ContentDetector,
    window: usize,
    threshold: f64,
    min_content_val: f64,
    buffer: VecDeque<Sample>,
    frame_count: u32,
}

impl AdaptiveDetector {
    /// PySceneDetect defaults: `frame_window = 2`, `threshold = 3.0`,
    /// `min_content_val = 15.0`.
    pub fn new() -> Result<Self> {
        Self::with_config(2, 3.0, 15.0, ComponentWeights::default(), EdgeParams::default())
    }

    #[instrument(skip(weights, edge_params))]
    pub fn with_config(
        frame_window: u32,
        threshold: f64,
        min_content_val: f64,
        weights: ComponentWeights,
        edge_params: EdgeParams,
    ) -> Result<Self> {
        // The adaptive detector evaluates its own ratio against
        // `threshold`/`min_content_val`; the wrapped ContentDetector is
        // only used as a content_val computer, so its own flash filter
        // and absolute threshold are never consulted — min_scene_len=1
        // with Suppress mode keeps it inert.
        let content = ContentDetector::with_config(0.0, weights, edge_params, 1, FilterMode::Suppress)?;

        debug!(
            "Created AdaptiveDetector: frame_window={}, threshold={}, min_content_val={}",
            frame_window, threshold, min_content_val
        );

        Ok(Self {
            content,
            window: frame_window as usize,
            threshold,
            min_content_val,
            buffer: VecDeque::new(),
            frame_count: 0,
        })
    }

    fn rolling_mean_excluding_center(&self, center_index: usize) -> f64 {
        let mut sum = 0.0;
        let mut count = 0usize;
        for (i, sample) in self.buffer.iter().enumerate() {
            if i != center_index {
                sum += sample.content_val;
                count += 1;
            }
        }
        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }

    /// Once the buffer holds a full `2W+1` window, evaluate its center
    /// sample (`W` frames of lookbehind and lookahead both present) and
    /// slide the window by dropping the oldest sample. Called once per
    /// arriving frame from `process_frame`, and repeatedly with a
    /// shrinking window from `post_process` to flush the tail.
    fn try_emit_ready_cut(&mut self, stats: Option<&StatsManager>) -> Option<Cut> {
        let full_window = 2 * self.window + 1;
        if self.buffer.len() < full_window {
            return None;
        }

        let center_index = self.window;
        let center = &self.buffer[center_index];
        let mean = self.rolling_mean_excluding_center(center_index);
        let adaptive_ratio = center.content_val / mean.max(EPSILON);

        trace!(
            "Adaptive candidate frame {} content_val={:.3} mean={:.3} ratio={:.3}",
            center.timecode.frame_number(),
            center.content_val,
            mean,
            adaptive_ratio
        );

        let timecode = center.timecode;
        let content_val = center.content_val;

        if let Some(stats) = stats {
            stats.register_metric_keys(&METRIC_KEYS);
            stats.set_metrics(timecode, &[(ADAPTIVE_RATIO, adaptive_ratio)]);
        }

        let is_cut = adaptive_ratio > self.threshold && content_val > self.min_content_val;

        self.buffer.pop_front();

        if is_cut {
            debug!("Adaptive cut at frame {} (ratio={:.3})", timecode.frame_number(), adaptive_ratio);
            Some(Cut(timecode))
        } else {
            None
        }
    }
}

impl std::fmt::Debug for AdaptiveDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptiveDetector")
            .field("window", &self.window)
            .field("threshold", &self.threshold)
            .field("min_content_val", &self.min_content_val)
            .finish()
    }
}

impl Detector for AdaptiveDetector {
    fn name(&self) -> &'static str {
        "adaptive"
    }

    fn metric_keys(&self) -> &'static [MetricKey] {
        &METRIC_KEYS
    }

    fn event_buffer(&self) -> u32 {
        self.window as u32
    }

    #[instrument(skip(self, frame, stats))]
    fn process_frame(&mut self, timecode: Timecode, frame: &Frame, stats: Option<&StatsManager>) -> Result<Vec<Cut>> {
        self.frame_count += 1;

        let content_val = self.content.content_val(timecode, frame, stats)?;
        self.buffer.push_back(Sample { timecode, content_val });

        Ok(self.try_emit_ready_cut(stats).into_iter().collect())
    }

    #[instrument(skip(self))]
    fn post_process(&mut self, _last_timecode: Timecode) -> Result<Vec<Cut>> {
        // End of stream: whatever remains buffered is the trailing `W`
        // frames, each missing some or all of its lookahead. Per spec
        // (the last `W` frames never produce a cut, insufficient
        // neighbors), these are discarded rather than judged against a
        // shrunken window.
        if !self.buffer.is_empty() {
            trace!("Discarding {} trailing frame(s) with insufficient lookahead", self.buffer.len());
            self.buffer.clear();
        }
        Ok(Vec::new())
    }

    fn reset(&mut self) {
        self.content.reset();
        self.buffer.clear();
        self.frame_count = 0;
    }
}
