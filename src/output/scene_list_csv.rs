//! Scene-list CSV projection, per spec's scene-list format.

use std::path::Path;

use tracing::{debug, instrument};

use crate::error::Result;
use crate::scene::{Cut, Scene};

/// Options controlling the scene-list CSV layout.
#[derive(Debug, Clone, Copy)]
pub struct SceneListCsvOptions {
    /// Omit the leading cuts row, for strict RFC 4180 compliance.
    pub skip_cuts: bool,
}

impl Default for SceneListCsvOptions {
    fn default() -> Self {
        Self { skip_cuts: false }
    }
}

const HEADER: [&str; 10] = [
    "Scene Number",
    "Start Frame",
    "Start Timecode",
    "Start Time (seconds)",
    "End Frame",
    "End Timecode",
    "End Time (seconds)",
    "Length (frames)",
    "Length (timecode)",
    "Length (seconds)",
];

/// Write the scene list as CSV. `cuts` supplies the optional leading
/// "cut list" row; pass an empty slice if unavailable.
#[instrument(skip(scenes, cuts, path), fields(path = %path.as_ref().display()))]
pub fn write_scene_list_csv(
    scenes: &[Scene],
    cuts: &[Cut],
    path: impl AsRef<Path>,
    options: SceneListCsvOptions,
) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::WriterBuilder::new().flexible(true).from_path(path)?;

    if !options.skip_cuts {
        let mut row = vec!["Timecode List:".to_string()];
        row.extend(cuts.iter().map(|c| c.0.to_string_timecode()));
        writer.write_record(&row)?;
    }

    writer.write_record(HEADER)?;

    for (i, scene) in scenes.iter().enumerate() {
        writer.write_record([
            (i + 1).to_string(),
            scene.start.to_frames().to_string(),
            scene.start.to_string_timecode(),
            format!("{:.3}", scene.start.to_seconds()),
            scene.end.to_frames().to_string(),
            scene.end.to_string_timecode(),
            format!("{:.3}", scene.end.to_seconds()),
            scene.length_frames().to_string(),
            scene.length_timecode().to_string_timecode(),
            format!("{:.3}", scene.length_seconds()),
        ])?;
    }

    writer.flush()?;
    debug!("Wrote {} scenes to {}", scenes.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timecode::{Framerate, Timecode};

    fn scene(start: u32, end: u32) -> Scene {
        let fps = Framerate::new(25, 1);
        Scene { start: Timecode::from_frames(start, fps), end: Timecode::from_frames(end, fps) }
    }

    #[test]
    fn test_write_scene_list_with_cuts_row() {
        let dir = std::env::temp_dir().join(format!("scenelist_csv_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("scenes.csv");

        let scenes = vec![scene(1, 51), scene(51, 101)];
        let cuts = vec![Cut(Timecode::from_frames(51, Framerate::new(25, 1)))];
        write_scene_list_csv(&scenes, &cuts, &path, SceneListCsvOptions::default()).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert!(lines.next().unwrap().starts_with("Timecode List:"));
        assert!(lines.next().unwrap().starts_with("Scene Number"));
        assert_eq!(lines.clone().count(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_skip_cuts_omits_leading_row() {
        let dir = std::env::temp_dir().join(format!("scenelist_csv_skip_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("scenes.csv");

        let scenes = vec![scene(1, 51)];
        write_scene_list_csv(&scenes, &[], &path, SceneListCsvOptions { skip_cuts: true }).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.lines().next().unwrap().starts_with("Scene Number"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
