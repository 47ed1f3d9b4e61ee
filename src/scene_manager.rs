//! The pipeline driver: decode -> crop -> downscale -> detector dispatch,
//! scene assembly, and the cancellation/decode-error handling around it.
//!
//! The producer/consumer split described in spec §5 is implemented with a
//! bounded `std::sync::mpsc::sync_channel` — the producer thread owns the
//! `FrameSource` and does crop/downscale, the consumer (this thread) owns
//! detector dispatch and stats writes, matching the "off the hot path"
//! guidance for StatsManager access.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::detector::Detector;
use crate::error::{Result, SceneDetectError};
use crate::frame::{DownscaleFactor, DownscaleMethod, Frame};
use crate::frame_source::FrameSource;
use crate::scene::{assemble_scenes, merge_cuts, AssemblyConfig, Cut, Scene};
use crate::stats_manager::StatsManager;
use crate::timecode::Timecode;

const CHANNEL_CAPACITY: usize = 8;

/// A crop rectangle applied after decode, before downscale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Configuration for one detection job. Mirrors [`crate::scene::AssemblyConfig`]
/// plus the pipeline-level knobs from spec §4.10.
#[derive(Debug, Clone)]
pub struct SceneManagerConfig {
    pub frame_skip: u32,
    pub downscale: Option<DownscaleFactor>,
    pub downscale_method: DownscaleMethod,
    pub crop: Option<CropRect>,
    pub start: Option<Timecode>,
    pub end: Option<Timecode>,
    pub duration: Option<Timecode>,
    pub assembly: AssemblyConfig,
    pub max_consecutive_decode_failures: u32,
}

impl Default for SceneManagerConfig {
    fn default() -> Self {
        Self {
            frame_skip: 0,
            downscale: None,
            downscale_method: DownscaleMethod::default(),
            crop: None,
            start: None,
            end: None,
            duration: None,
            assembly: AssemblyConfig::default(),
            max_consecutive_decode_failures: 3,
        }
    }
}

/// A tentative cut held back until its detector's `event_buffer()` frames
/// have elapsed, per spec §9 "Retroactive cuts".
struct PendingCut {
    cut: Cut,
    /// Frame index (consumer-side, monotonically increasing from 1) at
    /// which this cut becomes final.
    release_at: u64,
}

/// Drives one detection job end to end: decode, dispatch, scene assembly.
///
/// One `SceneManager` per job; it does not share mutable state with any
/// other instance (aside from a `StatsManager` the caller explicitly
/// hands to more than one job, which is the caller's choice, not this
/// type's).
pub struct SceneManager {
    detectors: Vec<Box<dyn Detector + Send>>,
    stats: Option<Arc<StatsManager>>,
    config: SceneManagerConfig,
    cancel: Arc<AtomicBool>,
}

enum ProducerMessage {
    Frame(Frame),
    DecodeError(SceneDetectError),
    EndOfStream,
}

impl SceneManager {
    pub fn new(config: SceneManagerConfig) -> Self {
        Self { detectors: Vec::new(), stats: None, config, cancel: Arc::new(AtomicBool::new(false)) }
    }

    pub fn add_detector(&mut self, detector: Box<dyn Detector + Send>) {
        self.detectors.push(detector);
    }

    pub fn set_stats_manager(&mut self, stats: Arc<StatsManager>) {
        self.stats = Some(stats);
    }

    /// A cooperative cancellation handle: the producer checks it between
    /// frames and while blocked on the channel, unblocking within one
    /// frame period.
    pub fn cancellation_token(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// Run the full pipeline against `source`, invoking `on_cut`
    /// synchronously (in cut-timestamp order) whenever a new cut is
    /// merged into the running cut list, and returning the assembled
    /// scene list once the source is exhausted.
    #[instrument(skip(self, source, on_cut))]
    pub fn detect_scenes<S>(&mut self, mut source: S, mut on_cut: impl FnMut(Timecode)) -> Result<Vec<Scene>>
    where
        S: FrameSource + Send + 'static,
    {
        let fps = source.framerate();
        let run_start = match self.config.start {
            Some(tc) => {
                source.seek(tc)?;
                tc
            }
            None => source.position(),
        };
        let run_end = match (self.config.end, self.config.duration) {
            (Some(end), _) => end,
            (None, Some(duration)) => run_start + duration,
            (None, None) => source.duration().unwrap_or(run_start),
        };

        let crop = self.config.crop;
        let downscale = self.config.downscale;
        let downscale_method = self.config.downscale_method;
        let frame_skip = self.config.frame_skip;
        let max_consecutive_decode_failures = self.config.max_consecutive_decode_failures;
        let cancel = self.cancel.clone();

        let (tx, rx) = sync_channel::<ProducerMessage>(CHANNEL_CAPACITY);

        let producer = std::thread::spawn(move || {
            let mut consecutive_failures = 0u32;
            loop {
                if cancel.load(Ordering::Relaxed) {
                    let _ = tx.send(ProducerMessage::EndOfStream);
                    return;
                }
                if source.position() >= run_end {
                    let _ = tx.send(ProducerMessage::EndOfStream);
                    return;
                }

                match source.read() {
                    Ok(None) => {
                        let _ = tx.send(ProducerMessage::EndOfStream);
                        return;
                    }
                    Ok(Some(frame)) => {
                        consecutive_failures = 0;
                        let frame = match apply_crop_downscale(frame, crop, downscale, downscale_method) {
                            Ok(f) => f,
                            Err(e) => {
                                if tx.send(ProducerMessage::DecodeError(e)).is_err() {
                                    return;
                                }
                                continue;
                            }
                        };
                        if tx.send(ProducerMessage::Frame(frame)).is_err() {
                            return;
                        }
                        if frame_skip > 0 {
                            for _ in 0..frame_skip {
                                if source.read().unwrap_or(None).is_none() {
                                    break;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        consecutive_failures += 1;
                        let fatal = consecutive_failures >= max_consecutive_decode_failures
                            || matches!(e, SceneDetectError::PersistentDecodeFailure { .. });
                        if tx.send(ProducerMessage::DecodeError(e)).is_err() {
                            return;
                        }
                        if fatal {
                            return;
                        }
                    }
                }
            }
        });

        let result = self.consume(&rx, fps, run_start, run_end, &mut on_cut);

        // Ensure the producer is not left blocked on a full channel after
        // an early consumer exit (e.g. a fatal error below).
        self.cancel.store(true, Ordering::Relaxed);
        while rx.try_recv().is_ok() {}
        let _ = producer.join();

        let cuts = result?;
        Ok(self.assemble(&cuts, run_start, run_end))
    }

    fn consume(
        &mut self,
        rx: &std::sync::mpsc::Receiver<ProducerMessage>,
        fps: crate::timecode::Framerate,
        run_start: Timecode,
        run_end: Timecode,
        on_cut: &mut impl FnMut(Timecode),
    ) -> Result<Vec<Cut>> {
        let mut cut_list: Vec<Cut> = Vec::new();
        let mut pending: Vec<PendingCut> = Vec::new();
        let mut frame_index: u64 = 0;
        let mut last_timecode = run_start;
        let mut skip_count: u32 = 0;

        loop {
            match rx.recv_timeout(Duration::from_secs(60)) {
                Ok(ProducerMessage::EndOfStream) => break,
                Ok(ProducerMessage::DecodeError(e)) => {
                    skip_count += 1;
                    if e.is_transient_decode_error() {
                        warn!("Skipping frame after transient decode error: {e} (skip_count={skip_count})");
                        continue;
                    }
                    return Err(e);
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(SceneDetectError::internal_error("producer stalled for 60s, aborting job"));
                }
                Err(RecvTimeoutError::Disconnected) => break,
                Ok(ProducerMessage::Frame(frame)) => {
                    frame_index += 1;
                    last_timecode = frame.timecode();

                    let mut new_cuts = Vec::new();
                    for detector in self.detectors.iter_mut() {
                        // StatsManager's interior mutability means a
                        // shared reference is enough; detectors call
                        // through `&self` methods that lock internally.
                        let cuts = detector.process_frame(frame.timecode(), &frame, self.stats.as_deref())?;
                        if detector.event_buffer() > 0 {
                            for cut in cuts {
                                pending.push(PendingCut { cut, release_at: frame_index + detector.event_buffer() as u64 });
                            }
                        } else {
                            new_cuts.extend(cuts);
                        }
                    }

                    let mut released = Vec::new();
                    pending.retain(|p| {
                        if p.release_at <= frame_index {
                            released.push(p.cut);
                            false
                        } else {
                            true
                        }
                    });
                    new_cuts.extend(released);

                    if !new_cuts.is_empty() {
                        merge_cuts(&mut cut_list, new_cuts.clone());
                        let mut sorted = new_cuts;
                        sorted.sort_by_key(|c| c.0.to_frames());
                        for cut in sorted {
                            on_cut(cut.0);
                        }
                    }

                    if frame.timecode() >= run_end {
                        break;
                    }
                }
            }
        }

        let mut final_cuts = Vec::new();
        for detector in self.detectors.iter_mut() {
            final_cuts.extend(detector.post_process(last_timecode)?);
        }
        for pending_cut in pending {
            final_cuts.push(pending_cut.cut);
        }
        if !final_cuts.is_empty() {
            merge_cuts(&mut cut_list, final_cuts.clone());
            let mut sorted = final_cuts;
            sorted.sort_by_key(|c| c.0.to_frames());
            for cut in sorted {
                on_cut(cut.0);
            }
        }

        let _ = fps;
        Ok(cut_list)
    }

    /// Assemble the final scene list from a completed cut list. Exposed
    /// separately from `detect_scenes` so callers can run assembly with
    /// a different `AssemblyConfig` against an already-computed cut list
    /// (e.g. tuning `min_scene_len` without rerunning detection).
    pub fn assemble(&self, cuts: &[Cut], start: Timecode, end: Timecode) -> Vec<Scene> {
        assemble_scenes(cuts, start, end, self.config.assembly)
    }
}

fn apply_crop_downscale(
    frame: Frame,
    crop: Option<CropRect>,
    downscale: Option<DownscaleFactor>,
    method: DownscaleMethod,
) -> Result<Frame> {
    let frame = match crop {
        Some(rect) => frame.crop(rect.x, rect.y, rect.width, rect.height)?,
        None => frame,
    };
    let frame = match downscale {
        Some(factor) => frame.downscale(factor, method)?,
        None => frame,
    };
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_source::test_double::VecFrameSource;
    use crate::timecode::Framerate;

    #[test]
    fn test_no_detectors_no_cuts() {
        let mut manager = SceneManager::new(SceneManagerConfig::default());
        let source = VecFrameSource::new(Framerate::new(30, 1), 16, 16, vec![(0, 0, 0); 10]);
        let mut cut_count = 0;
        let scenes = manager.detect_scenes(source, |_| cut_count += 1).unwrap();
        assert_eq!(scenes.len(), 1);
        assert_eq!(cut_count, 0);
    }

    #[test]
    fn test_on_cut_invoked_for_content_detector() {
        use crate::detectors::content::ContentDetector;

        let mut manager = SceneManager::new(SceneManagerConfig::default());
        manager.add_detector(Box::new(ContentDetector::new(10.0).unwrap()));

        let mut colors = vec![(0u8, 0u8, 0u8); 20];
        for c in colors.iter_mut().skip(10) {
            *c = (255, 255, 255);
        }
        let source = VecFrameSource::new(Framerate::new(30, 1), 16, 16, colors);

        let mut cut_timecodes = Vec::new();
        let scenes = manager.detect_scenes(source, |tc| cut_timecodes.push(tc)).unwrap();
        assert!(!cut_timecodes.is_empty());
        assert_eq!(scenes.len(), cut_timecodes.len() + 1);
    }

    #[test]
    fn test_cancellation_stops_early() {
        let mut manager = SceneManager::new(SceneManagerConfig::default());
        let token = manager.cancellation_token();
        token.store(true, Ordering::Relaxed);
        let source = VecFrameSource::new(Framerate::new(30, 1), 8, 8, vec![(1, 1, 1); 100]);
        // Cancelling before any frame is read still yields the trivial
        // whole-range scene (no cuts observed), not an empty list.
        let scenes = manager.detect_scenes(source, |_| {}).unwrap();
        assert_eq!(scenes.len(), 1);
    }
}
