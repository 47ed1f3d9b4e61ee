//! Concrete [`crate::detector::Detector`] implementations.

pub mod adaptive;
pub mod content;
pub mod hash;
pub mod histogram;
pub mod threshold;

pub use adaptive::AdaptiveDetector;
pub use content::ContentDetector;
pub use hash::HashDetector;
pub use histogram::HistogramDetector;
pub use threshold::ThresholdDetector;

use crate::detector::MetricKey;

/// Every metric key a built-in detector can publish, spanning all five
/// detectors. Used by [`crate::stats_manager::StatsManager::load_csv`] to
/// tell an unknown stats column (one that belongs to no detector this
/// crate ships) apart from a registered-but-absent one.
pub const KNOWN_METRIC_KEYS: &[MetricKey] = &[
    content::CONTENT_VAL,
    content::DELTA_HUE,
    content::DELTA_SAT,
    content::DELTA_LUM,
    content::DELTA_EDGES,
    adaptive::ADAPTIVE_RATIO,
    threshold::AVERAGE_RGB,
    histogram::HIST_DIFF,
    hash::HASH_DIST,
];
