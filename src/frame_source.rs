//! Abstract pull-based frame stream: the contract every concrete decoder
//! (OpenCV-backed `VideoStream`, or an in-memory test double) must satisfy.

use crate::error::Result;
use crate::frame::Frame;
use crate::timecode::{Framerate, Timecode};

/// A single-consumer, blocking source of decoded frames in monotonic
/// presentation order.
///
/// `seek` is optional — sources that cannot seek (e.g. a live capture)
/// should return `SceneDetectError::UnsupportedOperation` rather than
/// panicking. `read` returning `Ok(None)` signals a clean end of stream;
/// a transient per-frame decode failure is a distinct `Err` variant that
/// the pipeline driver is expected to count and potentially tolerate (see
/// `SceneManager`).
pub trait FrameSource {
    /// Frames per second. Constant for the lifetime of a source; sources
    /// with a variable underlying framerate must still report a nominal
    /// value here and emit monotonic per-frame timecodes.
    fn framerate(&self) -> Framerate;

    /// `(width, height)` in pixels.
    fn frame_size(&self) -> (i32, i32);

    /// Total duration, if known. `None` for sources of unknown/unbounded
    /// length (e.g. a live stream).
    fn duration(&self) -> Option<Timecode>;

    /// The timecode of the next frame `read()` will return.
    fn position(&self) -> Timecode;

    /// Seek so the next `read()` returns the frame at (or nearest after,
    /// for VFR sources) `timecode`. Default: unsupported.
    fn seek(&mut self, _timecode: Timecode) -> Result<()> {
        Err(crate::error::SceneDetectError::UnsupportedOperation {
            operation: "seek".to_string(),
        })
    }

    /// Pull the next frame, or `Ok(None)` at end of stream.
    fn read(&mut self) -> Result<Option<Frame>>;
}

#[cfg(test)]
pub(crate) mod test_double {
    use super::*;
    use opencv::core::{Mat, Scalar, CV_8UC3};

    /// An in-memory [`FrameSource`] backed by a fixed list of solid-color
    /// frames, used to exercise the pipeline deterministically without a
    /// real video file.
    pub struct VecFrameSource {
        fps: Framerate,
        width: i32,
        height: i32,
        colors: Vec<(u8, u8, u8)>,
        next_index: usize,
    }

    impl VecFrameSource {
        pub fn new(fps: Framerate, width: i32, height: i32, colors: Vec<(u8, u8, u8)>) -> Self {
            Self { fps, width, height, colors, next_index: 0 }
        }

        fn make_frame(&self, index: usize) -> Result<Frame> {
            let color = self.colors[index];
            let mat = Mat::new_rows_cols_with_default(
                self.height,
                self.width,
                CV_8UC3,
                Scalar::from((color.0 as f64, color.1 as f64, color.2 as f64)),
            )?;
            let tc = Timecode::from_frames(index as u32 + 1, self.fps);
            Frame::new(mat, tc)
        }
    }

    impl FrameSource for VecFrameSource {
        fn framerate(&self) -> Framerate {
            self.fps
        }

        fn frame_size(&self) -> (i32, i32) {
            (self.width, self.height)
        }

        fn duration(&self) -> Option<Timecode> {
            Some(Timecode::from_frames(self.colors.len() as u32, self.fps))
        }

        fn position(&self) -> Timecode {
            Timecode::from_frames(self.next_index as u32 + 1, self.fps)
        }

        fn seek(&mut self, timecode: Timecode) -> Result<()> {
            let index = timecode.frame_number().saturating_sub(1) as usize;
            if index > self.colors.len() {
                return Err(crate::error::SceneDetectError::internal_error("seek past end of stream"));
            }
            self.next_index = index;
            Ok(())
        }

        fn read(&mut self) -> Result<Option<Frame>> {
            if self.next_index >= self.colors.len() {
                return Ok(None);
            }
            let frame = self.make_frame(self.next_index)?;
            self.next_index += 1;
            Ok(Some(frame))
        }
    }

    #[test]
    fn test_vec_frame_source_basic() {
        let mut source = VecFrameSource::new(
            Framerate::new(30, 1),
            16,
            16,
            vec![(0, 0, 0), (0, 0, 0), (255, 255, 255)],
        );
        assert_eq!(source.frame_size(), (16, 16));
        assert_eq!(source.read().unwrap().unwrap().timecode().frame_number(), 1);
        assert_eq!(source.read().unwrap().unwrap().timecode().frame_number(), 2);
        assert_eq!(source.read().unwrap().unwrap().timecode().frame_number(), 3);
        assert!(source.read().unwrap().is_none());
    }

    #[test]
    fn test_vec_frame_source_seek() {
        let mut source = VecFrameSource::new(Framerate::new(25, 1), 8, 8, vec![(1, 1, 1); 10]);
        source.seek(Timecode::from_frames(5, Framerate::new(25, 1))).unwrap();
        assert_eq!(source.read().unwrap().unwrap().timecode().frame_number(), 5);
    }
}
