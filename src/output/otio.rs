//! OpenTimelineIO JSON projection: one clip per scene on a single track.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::scene::Scene;

#[derive(Serialize)]
struct OtioRationalTime {
    #[serde(rename = "OTIO_SCHEMA")]
    schema: &'static str,
    value: f64,
    rate: f64,
}

#[derive(Serialize)]
struct OtioTimeRange {
    #[serde(rename = "OTIO_SCHEMA")]
    schema: &'static str,
    start_time: OtioRationalTime,
    duration: OtioRationalTime,
}

#[derive(Serialize)]
struct OtioClip {
    #[serde(rename = "OTIO_SCHEMA")]
    schema: &'static str,
    name: String,
    source_range: OtioTimeRange,
}

#[derive(Serialize)]
struct OtioTrack {
    #[serde(rename = "OTIO_SCHEMA")]
    schema: &'static str,
    name: &'static str,
    kind: &'static str,
    children: Vec<OtioClip>,
}

#[derive(Serialize)]
struct OtioTimeline {
    #[serde(rename = "OTIO_SCHEMA")]
    schema: &'static str,
    name: String,
    tracks: OtioStack,
}

#[derive(Serialize)]
struct OtioStack {
    #[serde(rename = "OTIO_SCHEMA")]
    schema: &'static str,
    children: Vec<OtioTrack>,
}

fn rational_time(frame: f64, rate: f64) -> OtioRationalTime {
    OtioRationalTime { schema: "RationalTime.1", value: frame, rate }
}

/// Serialize the scene list as an OTIO timeline with one video track and
/// one clip per scene.
#[instrument(skip(scenes, path), fields(path = %path.as_ref().display()))]
pub fn write_otio(scenes: &[Scene], name: &str, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();

    let children = scenes
        .iter()
        .enumerate()
        .map(|(i, scene)| {
            let rate = scene.start.fps().as_f64();
            OtioClip {
                schema: "Clip.2",
                name: format!("Scene {:03}", i + 1),
                source_range: OtioTimeRange {
                    schema: "TimeRange.1",
                    start_time: rational_time(scene.start.to_frames() as f64, rate),
                    duration: rational_time(scene.length_frames() as f64, rate),
                },
            }
        })
        .collect();

    let timeline = OtioTimeline {
        schema: "Timeline.1",
        name: name.to_string(),
        tracks: OtioStack {
            schema: "Stack.1",
            children: vec![OtioTrack { schema: "Track.1", name: "Video", kind: "Video", children }],
        },
    };

    let json = serde_json::to_string_pretty(&timeline)
        .map_err(|e| crate::error::SceneDetectError::internal_error(format!("OTIO serialization failed: {e}")))?;
    std::fs::write(path, json)?;
    debug!("Wrote OTIO timeline for {} scenes to {}", scenes.len(), path.display());
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
    fn test_write_otio_one_clip_per_scene() {
        let dir = std::env::temp_dir().join(format!("otio_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("out.otio");

        write_otio(&[scene(1, 51), scene(51, 101)], "demo", &path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
        let clips = &parsed["tracks"]["children"][0]["children"];
        assert_eq!(clips.as_array().unwrap().len(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }
}
