//! Flash filter for enforcing minimum scene length requirements on a
//! detector's raw cut stream.
//!
//! This implements the `filter_mode` logic from PySceneDetect's
//! `ContentDetector`: it prevents false positive scene cuts by enforcing a
//! minimum separation between detected cuts, filtering out brief flashes,
//! camera flicker, and other transient changes *before* the cut stream
//! reaches scene assembly. This is a distinct stage from
//! `drop_short_scenes`/`merge_last_scene`, which act on the already
//! assembled scene list (see `crate::scene::assemble_scenes`) — the two
//! do not compose automatically, by design (see crate-level docs).

use tracing::{debug, instrument, trace};

use crate::timecode::Timecode;

/// Filter mode for handling consecutive scene cuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Merge consecutive cuts shorter than filter length.
    Merge,
    /// Suppress consecutive cuts until the filter length has passed.
    Suppress,
}

impl Default for FilterMode {
    fn default() -> Self {
        FilterMode::Merge
    }
}

/// Filters a detector's cut stream to enforce minimum scene length
/// requirements.
#[derive(Debug)]
pub struct FlashFilter {
    mode: FilterMode,
    min_scene_length: u32,
    last_cut_frame: Option<u32>,
    last_above_threshold: Option<u32>,
    merge_triggered: bool,
    merge_start_frame: Option<u32>,
}

impl FlashFilter {
    /// Create a new FlashFilter with merge mode (PySceneDetect's
    /// `ContentDetector` default).
    ///
    /// # Panics
    /// Panics if `min_scene_length` is 0.
    #[instrument]
    pub fn new(min_scene_length: u32) -> Self {
        Self::new_with_mode(FilterMode::default(), min_scene_length)
    }

    /// Create a new FlashFilter with the specified mode.
    #[instrument]
    pub fn new_with_mode(mode: FilterMode, min_scene_length: u32) -> Self {
        assert!(min_scene_length > 0, "Minimum scene length must be positive, got: {}", min_scene_length);

        debug!("Created FlashFilter with mode: {:?}, min_scene_length: {}", mode, min_scene_length);

        Self {
            mode,
            min_scene_length,
            last_cut_frame: None,
            last_above_threshold: None,
            merge_triggered: false,
            merge_start_frame: None,
        }
    }

    /// Filter a potential scene cut based on timing requirements.
    ///
    /// Returns the list of confirmed scene cuts (usually 0 or 1 item).
    #[instrument(skip(self))]
    pub fn filter(&mut self, timecode: Timecode, above_threshold: bool) -> Vec<Timecode> {
        let current_frame = timecode.frame_number();

        trace!("Filter input: frame={}, above_threshold={}", current_frame, above_threshold);

        if above_threshold {
            self.last_above_threshold = Some(current_frame);
        }

        match self.mode {
            FilterMode::Suppress => self.filter_suppress(timecode, above_threshold),
            FilterMode::Merge => self.filter_merge(timecode, above_threshold),
        }
    }

    /// Once a cut is detected, no additional cuts are allowed until the
    /// minimum scene length has passed.
    fn filter_suppress(&mut self, timecode: Timecode, above_threshold: bool) -> Vec<Timecode> {
        if !above_threshold {
            return vec![];
        }

        let current_frame = timecode.frame_number();

        if let Some(last_frame) = self.last_cut_frame {
            let frames_since_last = current_frame.saturating_sub(last_frame);

            if frames_since_last < self.min_scene_length {
                debug!(
                    "Suppressing cut at frame {} (only {} frames since last cut at {})",
                    current_frame, frames_since_last, last_frame
                );
                return vec![];
            }
        }

        self.last_cut_frame = Some(current_frame);
        debug!("Scene cut confirmed at frame {} (suppress mode)", current_frame);

        vec![timecode]
    }

    /// Consecutive cuts within the minimum scene length are merged into a
    /// single cut emitted once the gap has closed.
    fn filter_merge(&mut self, timecode: Timecode, above_threshold: bool) -> Vec<Timecode> {
        let current_frame = timecode.frame_number();

        if let Some(last_above) = self.last_above_threshold {
            let frames_since_above = current_frame.saturating_sub(last_above);

            if self.merge_triggered && !above_threshold && frames_since_above >= self.min_scene_length {
                self.merge_triggered = false;

                if let Some(merge_start) = self.merge_start_frame {
                    let merge_duration = last_above.saturating_sub(merge_start);

                    if merge_duration >= self.min_scene_length {
                        debug!(
                            "Ending merge: emitting cut at frame {} (merged from frame {})",
                            last_above, merge_start
                        );

                        self.last_cut_frame = Some(last_above);
                        let cut_timecode = Timecode::from_frames(last_above, timecode.fps());
                        return vec![cut_timecode];
                    }
                }

                self.merge_start_frame = None;
            }
        }

        if !above_threshold {
            return vec![];
        }

        if let Some(last_frame) = self.last_cut_frame {
            let frames_since_last = current_frame.saturating_sub(last_frame);

            if frames_since_last >= self.min_scene_length {
                self.last_cut_frame = Some(current_frame);
                debug!("Scene cut confirmed at frame {} (merge mode - normal)", current_frame);
                return vec![timecode];
            } else if !self.merge_triggered {
                self.merge_triggered = true;
                self.merge_start_frame = Some(current_frame);
                debug!("Starting merge at frame {} (too soon after cut at {})", current_frame, last_frame);
                return vec![];
            }
        } else {
            self.last_cut_frame = Some(current_frame);
            debug!("First scene cut at frame {} (merge mode)", current_frame);
            return vec![timecode];
        }

        vec![]
    }

    pub fn min_scene_length(&self) -> u32 {
        self.min_scene_length
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn last_cut_frame(&self) -> Option<u32> {
        self.last_cut_frame
    }

    /// Reset the filter state, e.g. before reusing a detector on a second
    /// video.
    #[instrument(skip(self))]
    pub fn reset(&mut self) {
        debug!("Resetting FlashFilter state");
        self.last_cut_frame = None;
        self.last_above_threshold = None;
        self.merge_triggered = false;
        self.merge_start_frame = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timecode::Framerate;

    fn create_timecode(frame: u32) -> Timecode {
        Timecode::from_frames(frame, Framerate::new(25, 1))
    }

    #[test]
    fn test_flash_filter_creation() {
        let filter = FlashFilter::new(15);
        assert_eq!(filter.min_scene_length(), 15);
        assert_eq!(filter.mode(), FilterMode::Merge);
        assert_eq!(filter.last_cut_frame(), None);

        let filter_suppress = FlashFilter::new_with_mode(FilterMode::Suppress, 10);
        assert_eq!(filter_suppress.mode(), FilterMode::Suppress);
        assert_eq!(filter_suppress.min_scene_length(), 10);
    }

    #[test]
    #[should_panic(expected = "Minimum scene length must be positive")]
    fn test_flash_filter_zero_length() {
        FlashFilter::new(0);
    }

    #[test]
    fn test_suppress_mode_basic() {
        let mut filter = FlashFilter::new_with_mode(FilterMode::Suppress, 10);

        let cuts = filter.filter(create_timecode(100), true);
        assert_eq!(cuts.len(), 1);
        assert_eq!(cuts[0].frame_number(), 100);

        let cuts = filter.filter(create_timecode(105), true);
        assert_eq!(cuts.len(), 0);

        let cuts = filter.filter(create_timecode(115), true);
        assert_eq!(cuts.len(), 1);
        assert_eq!(cuts[0].frame_number(), 115);
    }

    #[test]
    fn test_suppress_mode_below_threshold() {
        let mut filter = FlashFilter::new_with_mode(FilterMode::Suppress, 10);

        let cuts = filter.filter(create_timecode(100), false);
        assert_eq!(cuts.len(), 0);

        let cuts = filter.filter(create_timecode(110), false);
        assert_eq!(cuts.len(), 0);
    }

    #[test]
    fn test_merge_mode_basic() {
        let mut filter = FlashFilter::new_with_mode(FilterMode::Merge, 10);

        let cuts = filter.filter(create_timecode(100), true);
        assert_eq!(cuts.len(), 1);
        assert_eq!(cuts[0].frame_number(), 100);

        let cuts = filter.filter(create_timecode(120), true);
        assert_eq!(cuts.len(), 1);
        assert_eq!(cuts[0].frame_number(), 120);
    }

    #[test]
    fn test_merge_mode_consecutive_cuts() {
        let mut filter = FlashFilter::new_with_mode(FilterMode::Merge, 10);

        let cuts = filter.filter(create_timecode(100), true);
        assert_eq!(cuts.len(), 1);

        let cuts = filter.filter(create_timecode(105), true);
        assert_eq!(cuts.len(), 0);

        let cuts = filter.filter(create_timecode(106), true);
        assert_eq!(cuts.len(), 0);

        let mut merged_at_106 = false;
        for frame in 107..120 {
            let cuts = filter.filter(create_timecode(frame), false);
            if frame >= 117 {
                if !cuts.is_empty() {
                    assert_eq!(cuts[0].frame_number(), 106);
                    merged_at_106 = true;
                    break;
                }
            } else {
                assert_eq!(cuts.len(), 0);
            }
        }
        assert!(merged_at_106);
    }

    #[test]
    fn test_filter_reset() {
        let mut filter = FlashFilter::new_with_mode(FilterMode::Suppress, 10);

        filter.filter(create_timecode(100), true);
        assert!(filter.last_cut_frame().is_some());

        filter.reset();
        assert_eq!(filter.last_cut_frame(), None);

        let cuts = filter.filter(create_timecode(50), true);
        assert_eq!(cuts.len(), 1);
    }

    #[test]
    fn test_frame_number_overflow_safety() {
        let mut filter = FlashFilter::new_with_mode(FilterMode::Suppress, 10);

        let cuts = filter.filter(create_timecode(u32::MAX - 5), true);
        assert_eq!(cuts.len(), 1);

        let cuts = filter.filter(create_timecode(u32::MAX), true);
        assert_eq!(cuts.len(), 0);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::timecode::Framerate;
    use proptest::prelude::*;

    fn create_timecode(frame: u32) -> Timecode {
        Timecode::from_frames(frame, Framerate::new(25, 1))
    }

    proptest! {
        /// No sequence of monotonically increasing frame numbers near
        /// `u32::MAX`, in either filter mode, panics or underflows — the
        /// arithmetic inside both filter paths is `saturating_sub`-based.
        #[test]
        fn never_panics_near_frame_overflow(
            offsets in prop::collection::vec(0u32..20, 1..30),
            min_scene_length in 1u32..50,
            suppress_mode in any::<bool>(),
        ) {
            let mode = if suppress_mode { FilterMode::Suppress } else { FilterMode::Merge };
            let mut filter = FlashFilter::new_with_mode(mode, min_scene_length);

            let mut frame = u32::MAX - 1_000;
            for (i, offset) in offsets.iter().enumerate() {
                frame = frame.saturating_add(*offset);
                let _ = filter.filter(create_timecode(frame), i % 2 == 0);
            }
        }
    }
}
