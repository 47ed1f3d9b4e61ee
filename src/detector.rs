//! The contract every detector implements, and the short ASCII key a
//! detector uses to publish per-frame metrics into a [`StatsManager`].
//!
//! A small capability set (`metric_keys`, `process_frame`, `post_process`,
//! `event_buffer`) is preferred over an inheritance hierarchy: the pipeline
//! never introspects concrete detector types, it only calls through this
//! trait object.

use crate::error::Result;
use crate::frame::Frame;
use crate::scene::Cut;
use crate::stats_manager::StatsManager;
use crate::timecode::Timecode;

/// A short ASCII identifier a detector registers to publish a per-frame
/// scalar metric, e.g. `content_val`, `delta_hue`, `hash_dist`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricKey(pub &'static str);

impl std::fmt::Display for MetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The interface every scene-change detector implements.
///
/// Detectors surface configuration errors at construction time (returning
/// `Err` from their constructor), never from inside `process_frame` — see
/// the error-handling design in the crate-level documentation.
pub trait Detector {
    /// A human-readable name, used in error messages and stats/report
    /// headers.
    fn name(&self) -> &'static str;

    /// The metric keys this detector publishes.
    fn metric_keys(&self) -> &'static [MetricKey];

    /// The maximum number of frames by which this detector's cut
    /// decisions may lag the current frame. `0` for purely reactive
    /// detectors (content); `> 0` for detectors with a centered lookahead
    /// window (adaptive). The pipeline driver uses this to know how long
    /// to hold a detector's most recent cuts as tentative.
    fn event_buffer(&self) -> u32 {
        0
    }

    /// Process one frame, in strictly increasing timecode order. Returns
    /// any cuts decided at this call — typically zero or one, but a
    /// detector with a positive `event_buffer` may emit a cut dated
    /// earlier than the current call.
    /// `StatsManager` is fully interior-mutable (a mutex-guarded
    /// per-frame row map), so a shared reference is sufficient for a
    /// detector to both read cache hits and write its own metrics.
    fn process_frame(
        &mut self,
        timecode: Timecode,
        frame: &Frame,
        stats: Option<&StatsManager>,
    ) -> Result<Vec<Cut>>;

    /// Called once after the final frame, to flush any cuts a detector
    /// was holding back pending more lookahead.
    fn post_process(&mut self, _last_timecode: Timecode) -> Result<Vec<Cut>> {
        Ok(Vec::new())
    }

    /// Reset internal state, e.g. before reusing a detector for a second
    /// video.
    fn reset(&mut self);
}
