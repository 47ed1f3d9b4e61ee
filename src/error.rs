//! Structured error types for the scene detection pipeline.
//!
//! This comprehensive error type covers all failure modes in the detection
//! pipeline, from video I/O issues to algorithm failures, matching the error
//! kinds a caller needs to distinguish (transient vs. fatal decode errors,
//! configuration mistakes caught at construction time, stats file corruption).

/// All possible errors from the scene detection system.
#[derive(Debug, thiserror::Error)]
pub enum SceneDetectError {
    #[error("Failed to open video file: {path}")]
    VideoOpenFailed { path: String },

    #[error("Video file not found: {path}")]
    VideoNotFound { path: String },

    #[error("Invalid video format or corrupted file: {path}")]
    InvalidVideoFormat { path: String },

    #[error("OpenCV error: {0}")]
    OpenCvError(#[from] opencv::Error),

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Failed to parse timecode '{text}': {reason}")]
    TimecodeParseError { text: String, reason: String },

    #[error("Frame processing failed at frame {frame}: {reason}")]
    FrameProcessingFailed { frame: u32, reason: String },

    #[error("Transient decode error at frame {frame}: {reason}")]
    DecodeError { frame: u32, reason: String },

    #[error("Too many consecutive decode failures ({count}); aborting")]
    PersistentDecodeFailure { count: u32 },

    #[error("Operation not supported by this frame source: {operation}")]
    UnsupportedOperation { operation: String },

    #[error("Stats file format error in {path}: {reason}")]
    StatsFileFormatError { path: String, reason: String },

    #[error("Detector '{detector}' failed: {reason}")]
    DetectorError { detector: String, reason: String },

    #[error("No frames found in video")]
    EmptyVideo,

    #[error("Unsupported video codec or format")]
    UnsupportedFormat,

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl SceneDetectError {
    /// Create a configuration error with a descriptive message.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::InvalidConfig { message: message.into() }
    }

    /// Create a frame processing error.
    pub fn frame_error(frame: u32, reason: impl Into<String>) -> Self {
        Self::FrameProcessingFailed { frame, reason: reason.into() }
    }

    /// Create a detector-internal failure, tagged with the detector's name.
    pub fn detector_error(detector: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DetectorError { detector: detector.into(), reason: reason.into() }
    }

    /// Create an internal error (for unexpected conditions).
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError { message: message.into() }
    }

    /// Whether this error represents a single-frame, recoverable decode
    /// failure as opposed to a fatal condition.
    pub fn is_transient_decode_error(&self) -> bool {
        matches!(self, Self::DecodeError { .. })
    }
}

/// Convenient Result type for scene detection operations.
pub type Result<T> = std::result::Result<T, SceneDetectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_types() {
        let error = SceneDetectError::config_error("Invalid threshold");
        assert!(matches!(error, SceneDetectError::InvalidConfig { .. }));

        let error = SceneDetectError::frame_error(42, "Processing failed");
        assert!(matches!(error, SceneDetectError::FrameProcessingFailed { frame: 42, .. }));

        let error = SceneDetectError::internal_error("Unexpected condition");
        assert!(matches!(error, SceneDetectError::InternalError { .. }));
    }

    #[test]
    fn test_error_display() {
        let error = SceneDetectError::VideoNotFound { path: "test.mp4".to_string() };
        assert_eq!(error.to_string(), "Video file not found: test.mp4");

        let error = SceneDetectError::config_error("Threshold must be positive");
        assert_eq!(error.to_string(), "Invalid configuration: Threshold must be positive");
    }

    #[test]
    fn test_transient_decode_error() {
        let transient = SceneDetectError::DecodeError { frame: 10, reason: "glitch".into() };
        assert!(transient.is_transient_decode_error());

        let fatal = SceneDetectError::PersistentDecodeFailure { count: 3 };
        assert!(!fatal.is_transient_decode_error());
    }
}
