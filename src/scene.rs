//! Cuts, scenes, and the post-processing pass that turns a sorted cut list
//! into a non-overlapping list of scene intervals.

use tracing::debug;

use crate::timecode::{Offset, Timecode};

/// A timecode marking the first frame of a new scene. The implicit first
/// cut, at the start of the processed range, is never materialized as a
/// `Cut` value — it is supplied directly to [`assemble_scenes`] as `start`.
#[derive(Debug, Clone, Copy)]
pub struct Cut(pub Timecode);

/// A half-open `[start, end)` interval of timecodes. `end` is exclusive:
/// the last included frame is `end - 1 frame`, but the scene's reported
/// end *time* is inclusive of that frame's presentation duration, i.e.
/// `end.to_seconds()`.
#[derive(Debug, Clone, Copy)]
pub struct Scene {
    pub start: Timecode,
    pub end: Timecode,
}

impl Scene {
    pub fn length_frames(&self) -> u32 {
        self.end.to_frames().saturating_sub(self.start.to_frames())
    }

    pub fn length_seconds(&self) -> f64 {
        self.end.to_seconds() - self.start.to_seconds()
    }

    pub fn length_timecode(&self) -> Timecode {
        Timecode::from_frames(self.length_frames(), self.start.fps())
    }
}

/// Configuration for the scene-assembly pass, mirroring
/// `SceneManager`'s relevant fields so assembly can be unit tested
/// independently of the pipeline driver.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyConfig {
    pub min_scene_len: u32,
    pub drop_short_scenes: bool,
    pub merge_last_scene: bool,
    pub start_in_scene: bool,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            min_scene_len: 0,
            drop_short_scenes: false,
            merge_last_scene: false,
            start_in_scene: true,
        }
    }
}

/// Turn a sorted, de-duplicated cut list into a list of non-overlapping
/// scenes covering `[start, end)`.
///
/// Invariants upheld on a non-empty result: scenes are strictly ordered
/// and pairwise disjoint, the first scene's start equals `start`, the
/// last scene's end equals `end`, and every scene has length >=
/// `min_scene_len` unless it was produced by an explicit drop.
pub fn assemble_scenes(cuts: &[Cut], start: Timecode, end: Timecode, config: AssemblyConfig) -> Vec<Scene> {
    if cuts.is_empty() {
        return if config.start_in_scene { vec![Scene { start, end }] } else { Vec::new() };
    }

    // Build provisional scene boundaries: start, each cut's timecode, end.
    let mut boundaries: Vec<Timecode> = Vec::with_capacity(cuts.len() + 2);
    boundaries.push(start);
    for cut in cuts {
        if cut.0.to_frames() > start.to_frames() && cut.0.to_frames() < end.to_frames() {
            boundaries.push(cut.0);
        }
    }
    boundaries.push(end);

    let mut scenes: Vec<Scene> = boundaries
        .windows(2)
        .map(|w| Scene { start: w[0], end: w[1] })
        .collect();

    apply_min_scene_len(&mut scenes, config);

    if config.merge_last_scene && scenes.len() > 1 {
        let last = scenes.last().unwrap();
        if last.length_frames() < config.min_scene_len {
            let dropped = scenes.pop().unwrap();
            let new_len = scenes.len();
            scenes[new_len - 1].end = dropped.end;
            debug!("Merged trailing short scene into predecessor (merge_last_scene)");
        }
    }

    scenes
}

fn apply_min_scene_len(scenes: &mut Vec<Scene>, config: AssemblyConfig) {
    if config.min_scene_len == 0 {
        return;
    }

    let mut i = 0;
    while i < scenes.len() {
        if scenes[i].length_frames() >= config.min_scene_len {
            i += 1;
            continue;
        }

        if config.drop_short_scenes {
            debug!("Dropping short scene [{}, {})", scenes[i].start, scenes[i].end);
            scenes.remove(i);
            // Do not expand neighbors; do not advance i, re-check the new
            // scene now at this index.
            continue;
        }

        if i + 1 < scenes.len() {
            // Merge forward: delete the cut bounding this scene on the
            // right by folding the next scene into it. Re-check the
            // combined scene at the same index in case it is still short.
            let next = scenes.remove(i + 1);
            scenes[i].end = next.end;
            debug!("Merged short scene forward, new end {}", scenes[i].end);
            continue;
        }

        if i > 0 {
            // Trailing short scene with no successor: merge into the
            // predecessor instead (delete the cut bounding it on the
            // left).
            let short = scenes.remove(i);
            scenes[i - 1].end = short.end;
            debug!("Merged trailing short scene into predecessor, new end {}", scenes[i - 1].end);
            i -= 1;
            continue;
        }

        // Only one scene in the whole run and it's short: nothing to
        // merge with; leave it as the sole scene.
        i += 1;
    }
}

/// Merge two cut lists, de-duplicating cuts within 1 frame of each other
/// and keeping the list sorted by timecode.
pub fn merge_cuts(existing: &mut Vec<Cut>, new_cuts: Vec<Cut>) {
    for cut in new_cuts {
        let is_duplicate = existing.iter().any(|c| {
            let a = c.0.to_frames() as i64;
            let b = cut.0.to_frames() as i64;
            (a - b).abs() <= 1
        });
        if !is_duplicate {
            existing.push(cut);
        }
    }
    existing.sort_by_key(|c| c.0.to_frames());
}

#[allow(dead_code)]
fn offset_from_frames(n: i64) -> Offset {
    Offset::Frames(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timecode::Framerate;

    fn fps() -> Framerate {
        Framerate::new(30, 1)
    }

    fn tc(frame: u32) -> Timecode {
        Timecode::from_frames(frame, fps())
    }

    #[test]
    fn test_no_cuts_single_scene() {
        let scenes = assemble_scenes(&[], tc(1), tc(301), AssemblyConfig { start_in_scene: true, ..Default::default() });
        assert_eq!(scenes.len(), 1);
        assert_eq!(scenes[0].start.to_frames(), 1);
        assert_eq!(scenes[0].end.to_frames(), 301);
    }

    #[test]
    fn test_no_cuts_empty_when_not_start_in_scene() {
        let scenes = assemble_scenes(&[], tc(1), tc(301), AssemblyConfig { start_in_scene: false, ..Default::default() });
        assert!(scenes.is_empty());
    }

    #[test]
    fn test_fast_cut_two_scenes() {
        let cuts = vec![Cut(tc(301))];
        let scenes = assemble_scenes(&cuts, tc(1), tc(601), AssemblyConfig::default());
        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[0].start.to_frames(), 1);
        assert_eq!(scenes[0].end.to_frames(), 301);
        assert_eq!(scenes[1].start.to_frames(), 301);
        assert_eq!(scenes[1].end.to_frames(), 601);
    }

    #[test]
    fn test_min_scene_len_merge() {
        // Cuts at 301 and 310 with min_scene_len 18: the [301,310) scene
        // is too short, so it is merged with its predecessor, collapsing
        // the cut at 310 and yielding [1,301) and [301,601).
        let cuts = vec![Cut(tc(301)), Cut(tc(310))];
        let config = AssemblyConfig { min_scene_len: 18, drop_short_scenes: false, ..Default::default() };
        let scenes = assemble_scenes(&cuts, tc(1), tc(601), config);
        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[0].end.to_frames(), 301);
        assert_eq!(scenes[1].start.to_frames(), 301);
        assert_eq!(scenes[1].end.to_frames(), 601);
    }

    #[test]
    fn test_drop_short_scenes() {
        // Cuts at 100, 105, 500 in a 601-frame run, min_scene_len=30,
        // drop_short_scenes=true -> [1,100) and [500,601); [100,105) and
        // [105,500) particulars: [100,105) length 5 < 30 dropped;
        // [105,500) length 395 >= 30 kept.
        let cuts = vec![Cut(tc(100)), Cut(tc(105)), Cut(tc(500))];
        let config = AssemblyConfig { min_scene_len: 30, drop_short_scenes: true, ..Default::default() };
        let scenes = assemble_scenes(&cuts, tc(1), tc(601), config);
        assert_eq!(scenes.len(), 3);
        assert_eq!((scenes[0].start.to_frames(), scenes[0].end.to_frames()), (1, 100));
        assert_eq!((scenes[1].start.to_frames(), scenes[1].end.to_frames()), (105, 500));
        assert_eq!((scenes[2].start.to_frames(), scenes[2].end.to_frames()), (500, 601));
    }

    #[test]
    fn test_merge_last_scene() {
        let cuts = vec![Cut(tc(300)), Cut(tc(590))];
        let config = AssemblyConfig { min_scene_len: 20, merge_last_scene: true, ..Default::default() };
        let scenes = assemble_scenes(&cuts, tc(1), tc(601), config);
        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes.last().unwrap().end.to_frames(), 601);
    }

    #[test]
    fn test_scenes_partition_processed_range() {
        let cuts = vec![Cut(tc(50)), Cut(tc(120)), Cut(tc(400))];
        let scenes = assemble_scenes(&cuts, tc(1), tc(601), AssemblyConfig::default());
        assert_eq!(scenes.first().unwrap().start.to_frames(), 1);
        assert_eq!(scenes.last().unwrap().end.to_frames(), 601);
        for window in scenes.windows(2) {
            assert_eq!(window[0].end.to_frames(), window[1].start.to_frames());
        }
    }

    #[test]
    fn test_merge_cuts_dedup() {
        let mut existing = vec![Cut(tc(100))];
        merge_cuts(&mut existing, vec![Cut(tc(101)), Cut(tc(200))]);
        assert_eq!(existing.len(), 2);
        assert_eq!(existing[0].0.to_frames(), 100);
        assert_eq!(existing[1].0.to_frames(), 200);
    }

    #[test]
    fn test_scene_length_helpers() {
        let scene = Scene { start: tc(1), end: tc(31) };
        assert_eq!(scene.length_frames(), 30);
        assert!((scene.length_seconds() - 1.0).abs() < 1e-9);
    }
}
