//! Exact frame/second/timecode-string conversions at arbitrary (including
//! NTSC-fractional) framerates.
//!
//! Frame index is the canonical representation: storing seconds directly
//! accumulates rounding drift over a long timeline, so every other
//! representation is derived from `(frame_number, framerate)` on demand.
//! Framerate is kept as an exact rational (`num_rational::Rational64`)
//! rather than `f64` so that `24000/1001`-style rates round-trip without
//! drift; an `f64` view is exposed for display and logging only.

use std::fmt;
use std::ops::{Add, Sub};

use num_rational::Rational64;
use num_traits::ToPrimitive;

use crate::error::{Result, SceneDetectError};

/// A framerate, stored as an exact rational number of frames per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Framerate(Rational64);

impl Framerate {
    /// Construct a framerate from a numerator/denominator pair, e.g.
    /// `Framerate::new(24000, 1001)` for NTSC 23.976.
    ///
    /// # Panics
    /// Panics if the resulting rate is not positive.
    pub fn new(num: i64, den: i64) -> Self {
        assert!(den != 0, "framerate denominator must be non-zero");
        let r = Rational64::new(num, den);
        assert!(r > Rational64::from_integer(0), "framerate must be positive, got: {}", r);
        Self(r)
    }

    /// Construct a framerate from a floating-point value (e.g. parsed from
    /// a config file). The value is rationalized via a bounded continued
    /// fraction so common rates (23.976, 29.97, 59.94) recover their exact
    /// NTSC ratio rather than drifting.
    pub fn from_f64(fps: f64) -> Self {
        assert!(fps > 0.0, "framerate must be positive, got: {}", fps);
        let r = Rational64::approximate_float(fps)
            .unwrap_or_else(|| Rational64::new((fps * 1_000.0).round() as i64, 1_000));
        Self(r)
    }

    pub fn as_f64(&self) -> f64 {
        self.0.to_f64().expect("rational framerate should convert to f64")
    }

    pub fn as_ratio(&self) -> (i64, i64) {
        (*self.0.numer(), *self.0.denom())
    }
}

impl fmt::Display for Framerate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.as_f64())
    }
}

/// A point in time within a video, expressed as a 1-based display frame
/// number at a given [`Framerate`].
///
/// Two `Timecode`s are only directly comparable/arithmetic-combinable when
/// their framerates are equal; use [`Timecode::rescale`] to explicitly lift
/// one to another's rate.
#[derive(Debug, Clone, Copy)]
pub struct Timecode {
    frame_number: u32,
    fps: Framerate,
}

/// An offset applied to a [`Timecode`]: either a whole number of frames or
/// a duration in seconds, matching spec's "integer -> frames, fractional ->
/// seconds" parsing rule for arithmetic operands.
#[derive(Debug, Clone, Copy)]
pub enum Offset {
    Frames(i64),
    Seconds(f64),
}

impl Timecode {
    /// Create a timecode from a 1-based frame number.
    pub fn from_frames(frame_number: u32, fps: Framerate) -> Self {
        Self { frame_number, fps }
    }

    /// Create a timecode from a time offset in seconds, rounding to the
    /// nearest frame (half-up).
    pub fn from_seconds(seconds: f64, fps: Framerate) -> Self {
        let frame = round_half_up(seconds * fps.as_f64());
        Self::from_frames(frame.max(0) as u32, fps)
    }

    /// Parse a timecode string per spec: pure frame count "N", seconds
    /// "N[.n]s" (and a bare "N.n" also read as seconds), "HH:MM:SS[.nnn]",
    /// or "MM:SS[.nnn]".
    pub fn from_string(text: &str, fps: Framerate) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SceneDetectError::TimecodeParseError {
                text: text.to_string(),
                reason: "empty timecode".to_string(),
            });
        }

        if let Some(stripped) = text.strip_suffix(['s', 'S']) {
            let seconds: f64 = stripped.parse().map_err(|_| SceneDetectError::TimecodeParseError {
                text: text.to_string(),
                reason: "invalid seconds value".to_string(),
            })?;
            return Ok(Self::from_seconds(seconds, fps));
        }

        if text.contains(':') {
            return Self::from_hhmmss(text, fps);
        }

        if let Ok(frame_number) = text.parse::<u32>() {
            return Ok(Self::from_frames(frame_number, fps));
        }

        if let Ok(seconds) = text.parse::<f64>() {
            return Ok(Self::from_seconds(seconds, fps));
        }

        Err(SceneDetectError::TimecodeParseError {
            text: text.to_string(),
            reason: "unrecognized timecode format".to_string(),
        })
    }

    fn from_hhmmss(text: &str, fps: Framerate) -> Result<Self> {
        let parts: Vec<&str> = text.split(':').collect();
        let (h, m, s) = match parts.as_slice() {
            [h, m, s] => (*h, *m, *s),
            [m, s] => ("0", *m, *s),
            _ => {
                return Err(SceneDetectError::TimecodeParseError {
                    text: text.to_string(),
                    reason: "expected HH:MM:SS or MM:SS".to_string(),
                })
            }
        };

        let parse_int = |field: &str, name: &str| -> Result<f64> {
            field.parse::<f64>().map_err(|_| SceneDetectError::TimecodeParseError {
                text: text.to_string(),
                reason: format!("invalid {name} field '{field}'"),
            })
        };

        let hours = parse_int(h, "hours")?;
        let minutes = parse_int(m, "minutes")?;
        let seconds = parse_int(s, "seconds")?;

        if !(0.0..60.0).contains(&minutes) || !(0.0..60.0).contains(&seconds) {
            return Err(SceneDetectError::TimecodeParseError {
                text: text.to_string(),
                reason: "minutes/seconds fields must be in [0, 60)".to_string(),
            });
        }

        let total_seconds = hours * 3600.0 + minutes * 60.0 + seconds;
        Ok(Self::from_seconds(total_seconds, fps))
    }

    /// 1-based frame number.
    pub fn frame_number(&self) -> u32 {
        self.frame_number
    }

    pub fn fps(&self) -> Framerate {
        self.fps
    }

    pub fn to_frames(&self) -> u32 {
        self.frame_number
    }

    pub fn to_seconds(&self) -> f64 {
        self.frame_number as f64 / self.fps.as_f64()
    }

    /// Format as `HH:MM:SS.nnn`, millisecond precision. Guaranteed to
    /// recover `to_frames()` when parsed back via [`Timecode::from_string`]
    /// at the same framerate.
    pub fn to_string_timecode(&self) -> String {
        let total_ms = (self.to_seconds() * 1000.0).round() as u64;
        let ms = total_ms % 1000;
        let total_seconds = total_ms / 1000;
        let s = total_seconds % 60;
        let total_minutes = total_seconds / 60;
        let m = total_minutes % 60;
        let h = total_minutes / 60;
        format!("{:02}:{:02}:{:02}.{:03}", h, m, s, ms)
    }

    /// Re-express this timecode at a different framerate, preserving its
    /// position in time (nearest frame, half-up). Never applied implicitly.
    pub fn rescale(&self, fps: Framerate) -> Self {
        Self::from_seconds(self.to_seconds(), fps)
    }

    fn assert_same_rate(&self, other: &Self) {
        assert_eq!(
            self.fps.as_ratio(),
            other.fps.as_ratio(),
            "Timecodes at different framerates are not directly comparable; use rescale() first"
        );
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_timecode())
    }
}

impl PartialEq for Timecode {
    fn eq(&self, other: &Self) -> bool {
        self.assert_same_rate(other);
        self.frame_number == other.frame_number
    }
}

impl PartialOrd for Timecode {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.assert_same_rate(other);
        self.frame_number.partial_cmp(&other.frame_number)
    }
}

impl Add<Timecode> for Timecode {
    type Output = Timecode;

    fn add(self, rhs: Timecode) -> Timecode {
        self.assert_same_rate(&rhs);
        Timecode::from_frames(self.frame_number + rhs.frame_number, self.fps)
    }
}

impl Sub<Timecode> for Timecode {
    type Output = Timecode;

    fn sub(self, rhs: Timecode) -> Timecode {
        self.assert_same_rate(&rhs);
        Timecode::from_frames(self.frame_number.saturating_sub(rhs.frame_number), self.fps)
    }
}

impl Add<Offset> for Timecode {
    type Output = Timecode;

    fn add(self, rhs: Offset) -> Timecode {
        match rhs {
            Offset::Frames(n) => {
                let frame = (self.frame_number as i64 + n).max(0) as u32;
                Timecode::from_frames(frame, self.fps)
            }
            Offset::Seconds(s) => Timecode::from_seconds(self.to_seconds() + s, self.fps),
        }
    }
}

impl Sub<Offset> for Timecode {
    type Output = Timecode;

    fn sub(self, rhs: Offset) -> Timecode {
        match rhs {
            Offset::Frames(n) => Self::add(self, Offset::Frames(-n)),
            Offset::Seconds(s) => Self::add(self, Offset::Seconds(-s)),
        }
    }
}

fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ntsc_29_97() -> Framerate {
        Framerate::new(30_000, 1_001)
    }

    #[test]
    fn test_from_frames_and_seconds() {
        let fps = Framerate::new(30, 1);
        let tc = Timecode::from_frames(301, fps);
        assert_eq!(tc.to_frames(), 301);
        assert!((tc.to_seconds() - 301.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_ntsc_round_trip() {
        // fps = 24000/1001; "00:01:00.000" should be frame 1438.
        let fps = Framerate::new(24_000, 1_001);
        let tc = Timecode::from_string("00:01:00.000", fps).unwrap();
        assert_eq!(tc.to_frames(), 1438);
        assert_eq!(tc.to_string_timecode(), "00:01:00.000");
    }

    #[test]
    fn test_ntsc_arithmetic() {
        let fps = Framerate::new(24_000, 1_001);
        let a = Timecode::from_string("00:00:30.000", fps).unwrap();
        let b = Timecode::from_string("00:00:30.000", fps).unwrap();
        let sum = a + b;
        assert_eq!(sum.to_string_timecode(), "00:01:00.000");
    }

    #[test]
    fn test_round_trip_property_like() {
        let fps = ntsc_29_97();
        for frame in [0u32, 1, 2, 29, 30, 59, 600, 12345] {
            let tc = Timecode::from_frames(frame, fps);
            let s = tc.to_string_timecode();
            let back = Timecode::from_string(&s, fps).unwrap();
            assert_eq!(back.to_frames(), tc.to_frames(), "round-trip failed for frame {frame}");
        }
    }

    #[test]
    fn test_parse_variants() {
        let fps = Framerate::new(25, 1);
        assert_eq!(Timecode::from_string("50", fps).unwrap().to_frames(), 50);
        assert_eq!(Timecode::from_string("2s", fps).unwrap().to_frames(), 50);
        assert_eq!(Timecode::from_string("2.0", fps).unwrap().to_frames(), 50);
        assert_eq!(Timecode::from_string("00:00:02.000", fps).unwrap().to_frames(), 50);
        assert_eq!(Timecode::from_string("00:02.000", fps).unwrap().to_frames(), 50);
    }

    #[test]
    fn test_subtraction_saturates_at_zero() {
        let fps = Framerate::new(30, 1);
        let a = Timecode::from_frames(5, fps);
        let b = Timecode::from_frames(10, fps);
        let diff = a - b;
        assert_eq!(diff.to_frames(), 0);
    }

    #[test]
    fn test_offset_arithmetic() {
        let fps = Framerate::new(30, 1);
        let tc = Timecode::from_frames(100, fps);
        assert_eq!((tc + Offset::Frames(10)).to_frames(), 110);
        assert_eq!((tc - Offset::Frames(200)).to_frames(), 0);
        let with_seconds = tc + Offset::Seconds(1.0);
        assert_eq!(with_seconds.to_frames(), 130);
    }

    #[test]
    #[should_panic(expected = "not directly comparable")]
    fn test_mixed_framerate_comparison_panics() {
        let a = Timecode::from_frames(10, Framerate::new(30, 1));
        let b = Timecode::from_frames(10, Framerate::new(25, 1));
        let _ = a == b;
    }

    #[test]
    fn test_rescale() {
        let a = Timecode::from_frames(30, Framerate::new(30, 1));
        let rescaled = a.rescale(Framerate::new(60, 1));
        assert_eq!(rescaled.to_frames(), 60);
    }

    #[test]
    #[should_panic(expected = "framerate must be positive")]
    fn test_invalid_framerate_zero() {
        Framerate::new(0, 1);
    }

    #[test]
    #[should_panic(expected = "framerate must be positive")]
    fn test_invalid_framerate_negative() {
        Framerate::from_f64(-1.0);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// `from_string(to_string(t), fps).to_frames() == t.to_frames()` for
        /// any frame number at a representative set of framerates, including
        /// NTSC-fractional ones — the round-trip property from spec §8.
        #[test]
        fn round_trip_frame_to_string_to_frame(
            frame in 0u32..200_000,
            fps_choice in 0usize..4,
        ) {
            let fps = [
                Framerate::new(24, 1),
                Framerate::new(30, 1),
                Framerate::new(24_000, 1_001),
                Framerate::new(30_000, 1_001),
            ][fps_choice];

            let tc = Timecode::from_frames(frame, fps);
            let s = tc.to_string_timecode();
            let back = Timecode::from_string(&s, fps).unwrap();
            prop_assert_eq!(back.to_frames(), tc.to_frames());
        }

        /// Subtraction between two same-rate timecodes never underflows and
        /// always matches saturating frame-index subtraction.
        #[test]
        fn subtraction_saturates(a in 0u32..1_000_000, b in 0u32..1_000_000) {
            let fps = Framerate::new(30, 1);
            let diff = Timecode::from_frames(a, fps) - Timecode::from_frames(b, fps);
            prop_assert_eq!(diff.to_frames(), a.saturating_sub(b));
        }
    }
}
