//! Threshold detector: mean-pixel-brightness fade detection, per spec §4.6.

use opencv::{core, prelude::*};
use tracing::{debug, instrument, trace};

use crate::detector::{Detector, MetricKey};
use crate::error::{Result, SceneDetectError};
use crate::frame::Frame;
use crate::scene::Cut;
use crate::stats_manager::StatsManager;
use crate::timecode::Timecode;

pub const AVERAGE_RGB: MetricKey = MetricKey("average_rgb");

const METRIC_KEYS: [MetricKey; 1] = [AVERAGE_RGB];

/// Which direction of brightness crossing counts as entering a fade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeDirection {
    /// Fade to black: enter `InFade` when `average_rgb` drops below
    /// `threshold`.
    Floor,
    /// Fade to white: enter `InFade` when `average_rgb` rises above
    /// `threshold`.
    Ceiling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    InScene,
    InFade,
}

struct FadeStart {
    timecode: Timecode,
}

/// Two-state (`InScene`/`InFade`) brightness threshold detector with
/// `fade_bias`-weighted cut placement between the two threshold
/// crossings.
pub struct ThresholdDetector {
    threshold: f64,
    direction: FadeDirection,
    fade_bias: f64,
    add_last_scene: bool,
    state: State,
    fade_start: Option<FadeStart>,
    last_timecode: Option<Timecode>,
}

impl ThresholdDetector {
    /// PySceneDetect defaults: `threshold=12.0`, floor direction,
    /// `fade_bias=0.0`, `add_last_scene=true`.
    pub fn new(threshold: f64) -> Result<Self> {
        Self::with_config(threshold, FadeDirection::Floor, 0.0, true)
    }

    #[instrument]
    pub fn with_config(threshold: f64, direction: FadeDirection, fade_bias: f64, add_last_scene: bool) -> Result<Self> {
        if threshold < 0.0 {
            return Err(SceneDetectError::config_error(format!("threshold must be non-negative, got: {threshold}")));
        }
        if !(-1.0..=1.0).contains(&fade_bias) {
            return Err(SceneDetectError::config_error(format!("fade_bias must be in [-1, 1], got: {fade_bias}")));
        }

        debug!("Created ThresholdDetector: threshold={}, direction={:?}, fade_bias={}", threshold, direction, fade_bias);

        Ok(Self {
            threshold,
            direction,
            fade_bias,
            add_last_scene,
            state: State::InScene,
            fade_start: None,
            last_timecode: None,
        })
    }

    fn average_rgb(frame: &Frame) -> Result<f64> {
        let mat = frame.mat();
        let sum = core::sum_elems(mat).map_err(|e| {
            SceneDetectError::frame_error(frame.timecode().frame_number(), format!("sum failed: {e}"))
        })?;
        let channels = (mat.channels().max(1) as usize).min(3);
        let num_pixels = (mat.rows() * mat.cols()).max(1) as f64;
        let total: f64 = (0..channels).map(|i| sum[i]).sum();
        Ok(total / (num_pixels * channels as f64))
    }

    fn crosses_into_fade(&self, average_rgb: f64) -> bool {
        match self.direction {
            FadeDirection::Floor => average_rgb < self.threshold,
            FadeDirection::Ceiling => average_rgb > self.threshold,
        }
    }

    /// Interpolate a cut timecode linearly between the fade-start and
    /// fade-end frame indices, biased by `fade_bias`: -1 places the cut
    /// at the fade start, +1 at the fade end, 0 at the midpoint.
    fn biased_cut(&self, start: Timecode, end: Timecode) -> Timecode {
        let start_frame = start.to_frames() as f64;
        let end_frame = end.to_frames() as f64;
        let t = (self.fade_bias + 1.0) / 2.0;
        let frame = (start_frame + (end_frame - start_frame) * t).round() as u32;
        Timecode::from_frames(frame, start.fps())
    }
}

impl std::fmt::Debug for ThresholdDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThresholdDetector")
            .field("threshold", &self.threshold)
            .field("direction", &self.direction)
            .field("state", &self.state)
            .finish()
    }
}

impl Detector for ThresholdDetector {
    fn name(&self) -> &'static str {
        "threshold"
    }

    fn metric_keys(&self) -> &'static [MetricKey] {
        &METRIC_KEYS
    }

    #[instrument(skip(self, frame, stats))]
    fn process_frame(&mut self, timecode: Timecode, frame: &Frame, stats: Option<&StatsManager>) -> Result<Vec<Cut>> {
        let average_rgb = Self::average_rgb(frame)?;
        self.last_timecode = Some(timecode);

        if let Some(stats) = stats {
            stats.register_metric_keys(&METRIC_KEYS);
            stats.set_metrics(timecode, &[(AVERAGE_RGB, average_rgb)]);
        }

        trace!("Frame {} average_rgb={:.3} state={:?}", timecode.frame_number(), average_rgb, self.state);

        let crossed = self.crosses_into_fade(average_rgb);

        match (self.state, crossed) {
            (State::InScene, true) => {
                self.state = State::InFade;
                self.fade_start = Some(FadeStart { timecode });
                Ok(Vec::new())
            }
            (State::InFade, false) => {
                self.state = State::InScene;
                let start = self.fade_start.take().expect("InFade state implies fade_start is set");
                let cut_tc = self.biased_cut(start.timecode, timecode);
                debug!("Threshold cut at frame {} (fade {} -> {})", cut_tc.frame_number(), start.timecode.frame_number(), timecode.frame_number());
                Ok(vec![Cut(cut_tc)])
            }
            _ => Ok(Vec::new()),
        }
    }

    #[instrument(skip(self))]
    fn post_process(&mut self, last_timecode: Timecode) -> Result<Vec<Cut>> {
        if self.state == State::InFade && self.add_last_scene {
            if let Some(start) = self.fade_start.take() {
                debug!("Flushing trailing fade, cut at fade start frame {}", start.timecode.frame_number());
                self.state = State::InScene;
                return Ok(vec![Cut(start.timecode)]);
            }
        }
        let _ = last_timecode;
        Ok(Vec::new())
    }

    fn reset(&mut self) {
        self.state = State::InScene;
        self.fade_start = None;
        self.last_timecode = None;
    }
}
