//! Rust implementation of PySceneDetect's detection core: exact timecode
//! arithmetic, a pluggable frame source and detector interface, the
//! content/adaptive/threshold/histogram/hash detectors, a shared per-frame
//! stats cache, the two-stage pipeline driver that turns a cut stream into
//! an assembled scene list, and output projections (CSV/HTML/EDL/OTIO/QP/
//! scene images).
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use rust_scenedetect::{
//!     detectors::ContentDetector,
//!     scene_manager::{SceneManager, SceneManagerConfig},
//!     video_stream::VideoStream,
//! };
//!
//! let source = VideoStream::open("video.mp4")?;
//! let mut manager = SceneManager::new(SceneManagerConfig::default());
//! manager.add_detector(Box::new(ContentDetector::new(27.0)?));
//!
//! let scenes = manager.detect_scenes(source, |_timecode| {})?;
//! for (i, scene) in scenes.iter().enumerate() {
//!     println!("Scene {}: starts at frame {}", i + 1, scene.start.frame_number());
//! }
//! # Ok::<(), rust_scenedetect::error::SceneDetectError>(())
//! ```

#[cfg(feature = "binary")]
pub mod cli;
pub mod config;
pub mod detector;
pub mod detectors;
pub mod error;
pub mod flash_filter;
pub mod frame;
pub mod frame_source;
pub mod output;
pub mod scene;
pub mod scene_manager;
pub mod stats_manager;
pub mod timecode;
pub mod video_stream;

pub use config::{Config, ConfigError};
pub use detector::{Detector, MetricKey};
pub use error::{Result, SceneDetectError};
pub use frame::Frame;
pub use frame_source::FrameSource;
pub use scene::{AssemblyConfig, Cut, Scene};
pub use scene_manager::{SceneManager, SceneManagerConfig};
pub use stats_manager::StatsManager;
pub use timecode::{Framerate, Timecode};
pub use video_stream::VideoStream;

/// Initialize tracing for the library and CLI binary.
///
/// Call once at the start of a program to enable log output; `level` is a
/// `tracing_subscriber::EnvFilter` directive (e.g. `"debug"`, `"info"`) and
/// is overridden by `RUST_LOG` when set.
pub fn init_tracing(level: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt().with_env_filter(filter).with_target(false).with_thread_ids(true).with_file(true).with_line_number(true).init();
}
