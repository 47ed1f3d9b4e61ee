//! x264 `--qpfile` projection: one forced-I-frame line per cut.

use std::path::Path;

use tracing::{debug, instrument};

use crate::error::Result;
use crate::scene::Cut;

/// Write a qpfile: `<frame number> I` per cut, 0-based frame index
/// (x264's qpfile convention), in ascending order.
#[instrument(skip(cuts, path), fields(path = %path.as_ref().display()))]
pub fn write_qp_file(cuts: &[Cut], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut out = String::new();
    let mut frames: Vec<u32> = cuts.iter().map(|c| c.0.to_frames().saturating_sub(1)).collect();
    frames.sort_unstable();
    frames.dedup();
    for frame in frames {
        out.push_str(&format!("{frame} I\n"));
    }
    std::fs::write(path, out)?;
    debug!("Wrote qpfile with {} entries to {}", cuts.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timecode::{Framerate, Timecode};

    #[test]
    fn test_write_qp_file_zero_based_and_sorted() {
        let dir = std::env::temp_dir().join(format!("qpfile_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("out.qp");

        let fps = Framerate::new(25, 1);
        let cuts = vec![Cut(Timecode::from_frames(101, fps)), Cut(Timecode::from_frames(51, fps))];
        write_qp_file(&cuts, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "50 I\n100 I\n");

        std::fs::remove_dir_all(&dir).ok();
    }
}
