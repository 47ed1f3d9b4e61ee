//! CMX 3600 Edit Decision List projection: one cut-type event per scene,
//! reel `AX`, video track.

use std::path::Path;

use tracing::{debug, instrument};

use crate::error::Result;
use crate::scene::Scene;

fn edl_timecode(seconds: f64, fps: f64) -> String {
    let total_frames = (seconds * fps).round() as u64;
    let frame_rate = fps.round().max(1.0) as u64;
    let frames = total_frames % frame_rate;
    let total_seconds = total_frames / frame_rate;
    let s = total_seconds % 60;
    let total_minutes = total_seconds / 60;
    let m = total_minutes % 60;
    let h = total_minutes / 60;
    format!("{:02}:{:02}:{:02}:{:02}", h, m, s, frames)
}

/// Write a CMX 3600 EDL with one `AX`/`V`/`C` event per scene.
#[instrument(skip(scenes, path), fields(path = %path.as_ref().display()))]
pub fn write_edl(scenes: &[Scene], title: &str, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut out = String::new();
    out.push_str(&format!("TITLE: {title}\n"));
    out.push_str("FCM: NON-DROP FRAME\n\n");

    for (i, scene) in scenes.iter().enumerate() {
        let fps = scene.start.fps().as_f64();
        let src_in = edl_timecode(scene.start.to_seconds(), fps);
        let src_out = edl_timecode(scene.end.to_seconds(), fps);
        out.push_str(&format!(
            "{:03}  AX       V     C        {} {} {} {}\n",
            i + 1,
            src_in,
            src_out,
            src_in,
            src_out
        ));
        out.push_str(&format!("* FROM CLIP NAME: SCENE {:03}\n\n", i + 1));
    }

    std::fs::write(path, out)?;
    debug!("Wrote EDL for {} scenes to {}", scenes.len(), path.display());
    Ok(())
}
