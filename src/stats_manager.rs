//! Per-(frame, metric-key) cache with CSV persistence.
//!
//! A single `StatsManager` is shared across all detectors for one job: each
//! detector registers the metric keys it publishes and writes disjoint
//! columns into the same per-frame row, so the lock is held only for the
//! brief write/read of one row, never across a detector's pixel math.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use tracing::{debug, instrument, warn};

use crate::detector::MetricKey;
use crate::error::{Result, SceneDetectError};
use crate::timecode::{Framerate, Timecode};

type Row = std::collections::HashMap<String, f64>;

/// Interior-mutable metric cache, keyed by 1-based frame number.
///
/// Cheap to share: clone the `Arc` around it, not the manager itself (the
/// pipeline driver holds a single instance for the duration of a job).
#[derive(Debug, Default)]
pub struct StatsManager {
    rows: Mutex<BTreeMap<u32, Row>>,
    registered_keys: Mutex<Vec<MetricKey>>,
}

impl StatsManager {
    pub fn new() -> Self {
        Self { rows: Mutex::new(BTreeMap::new()), registered_keys: Mutex::new(Vec::new()) }
    }

    /// Register metric keys a detector will publish, preserving the first
    /// registration order (used as the CSV column order on save).
    pub fn register_metric_keys(&self, keys: &[MetricKey]) {
        let mut registered = self.registered_keys.lock().unwrap();
        for key in keys {
            if !registered.contains(key) {
                registered.push(*key);
            }
        }
    }

    /// Write metric values for a frame, merging into any existing row.
    pub fn set_metrics(&self, timecode: Timecode, metrics: &[(MetricKey, f64)]) {
        let mut rows = self.rows.lock().unwrap();
        let row = rows.entry(timecode.frame_number()).or_default();
        for (key, value) in metrics {
            row.insert(key.0.to_string(), *value);
        }
    }

    /// Read back the metrics recorded for a frame, or `None` if no row
    /// exists at all for that frame number (a present row missing one
    /// particular key yields that key simply absent from the returned map
    /// — modeling `NotPresent` as a missing entry rather than a variant).
    pub fn get_metrics(&self, timecode: Timecode) -> Option<Row> {
        let rows = self.rows.lock().unwrap();
        rows.get(&timecode.frame_number()).cloned()
    }

    /// Whether a specific metric key has already been recorded for a
    /// frame — the cache-hit check a detector uses to skip recomputation.
    pub fn metric_present(&self, timecode: Timecode, key: MetricKey) -> bool {
        let rows = self.rows.lock().unwrap();
        rows.get(&timecode.frame_number()).map(|row| row.contains_key(key.0)).unwrap_or(false)
    }

    pub fn frame_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// Load a previously saved stats CSV, merging into any existing rows.
    /// Tolerant of a legacy `#`-prefixed header line, missing registered
    /// columns (rows simply omit that key), and unknown columns (silently
    /// discarded — "known" means a member of
    /// [`crate::detectors::KNOWN_METRIC_KEYS`], not whatever happens to be
    /// registered on `self` at load time, since load typically runs before
    /// any detector has registered its keys for the new run).
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn load_csv(&self, path: impl AsRef<Path>, fps: Framerate) -> Result<()> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        let mut lines = contents.lines();
        let mut header_line = lines.next().ok_or_else(|| SceneDetectError::StatsFileFormatError {
            path: path.display().to_string(),
            reason: "empty stats file".to_string(),
        })?;
        if header_line.starts_with('#') {
            header_line = lines.next().ok_or_else(|| SceneDetectError::StatsFileFormatError {
                path: path.display().to_string(),
                reason: "missing header after legacy comment line".to_string(),
            })?;
        }

        let mut reader = csv::ReaderBuilder::new().has_headers(false).from_reader(header_line.as_bytes());
        let header: Vec<String> = reader
            .records()
            .next()
            .ok_or_else(|| SceneDetectError::StatsFileFormatError {
                path: path.display().to_string(),
                reason: "could not parse header row".to_string(),
            })?
            .map_err(SceneDetectError::from)?
            .iter()
            .map(|s| s.trim().to_string())
            .collect();

        if header.len() < 2 || header[0] != "Frame Number" {
            return Err(SceneDetectError::StatsFileFormatError {
                path: path.display().to_string(),
                reason: "missing 'Frame Number' column".to_string(),
            });
        }
        let metric_columns = &header[2..];

        let mut rows = self.rows.lock().unwrap();
        let mut body_reader =
            csv::ReaderBuilder::new().has_headers(false).from_reader(lines.collect::<Vec<_>>().join("\n").as_bytes());
        for result in body_reader.records() {
            let record = result.map_err(SceneDetectError::from)?;
            if record.is_empty() {
                continue;
            }
            let frame_number: u32 = record[0].parse().map_err(|_| SceneDetectError::StatsFileFormatError {
                path: path.display().to_string(),
                reason: format!("invalid frame number '{}'", &record[0]),
            })?;
            let _timecode = Timecode::from_string(&record[1], fps)?;

            let row = rows.entry(frame_number).or_default();
            for (i, column_name) in metric_columns.iter().enumerate() {
                if !crate::detectors::KNOWN_METRIC_KEYS.iter().any(|k| k.0 == column_name) {
                    continue;
                }
                let cell_index = i + 2;
                if let Some(cell) = record.get(cell_index) {
                    if let Ok(value) = cell.parse::<f64>() {
                        row.insert(column_name.clone(), value);
                    }
                }
            }
        }

        debug!("Loaded stats for {} frames from {}", rows.len(), path.display());
        Ok(())
    }

    /// Save all recorded rows to a stats CSV. Column order follows metric
    /// registration order; an existing file is overwritten. `fps` is
    /// needed to render the `Timecode` column from the stored frame
    /// numbers.
    #[instrument(skip(self, path, fps), fields(path = %path.as_ref().display()))]
    pub fn save_csv(&self, path: impl AsRef<Path>, fps: Framerate) -> Result<()> {
        let path = path.as_ref();
        let registered = self.registered_keys.lock().unwrap();
        let rows = self.rows.lock().unwrap();

        let mut writer = csv::WriterBuilder::new().from_path(path)?;

        let mut header = vec!["Frame Number".to_string(), "Timecode".to_string()];
        header.extend(registered.iter().map(|k| k.0.to_string()));
        writer.write_record(&header)?;

        for (&frame_number, row) in rows.iter() {
            let tc = Timecode::from_frames(frame_number, fps);
            let mut record = vec![frame_number.to_string(), tc.to_string_timecode()];
            for key in registered.iter() {
                let value = row.get(key.0).map(format_f64).unwrap_or_default();
                record.push(value);
            }
            writer.write_record(&record)?;
        }

        writer.flush()?;
        debug!("Saved stats for {} frames to {}", rows.len(), path.display());
        Ok(())
    }
}

fn format_f64(value: &f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        // `{}` never emits scientific notation for values in the normal
        // metric range (0..255ish); ryu-style shortest representation.
        let mut s = format!("{}", value);
        if !s.contains('.') {
            s.push_str(".0");
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HUE: MetricKey = MetricKey("delta_hue");
    const CONTENT: MetricKey = MetricKey("content_val");

    fn fps() -> Framerate {
        Framerate::new(25, 1)
    }

    #[test]
    fn test_set_and_get_metrics() {
        let stats = StatsManager::new();
        stats.register_metric_keys(&[CONTENT, HUE]);
        let tc = Timecode::from_frames(10, fps());
        stats.set_metrics(tc, &[(CONTENT, 12.5), (HUE, 3.0)]);

        let row = stats.get_metrics(tc).unwrap();
        assert_eq!(row.get("content_val"), Some(&12.5));
        assert_eq!(row.get("delta_hue"), Some(&3.0));
    }

    #[test]
    fn test_get_metrics_missing_frame_is_none() {
        let stats = StatsManager::new();
        assert!(stats.get_metrics(Timecode::from_frames(1, fps())).is_none());
    }

    #[test]
    fn test_metric_present_cache_hit() {
        let stats = StatsManager::new();
        let tc = Timecode::from_frames(1, fps());
        assert!(!stats.metric_present(tc, CONTENT));
        stats.set_metrics(tc, &[(CONTENT, 1.0)]);
        assert!(stats.metric_present(tc, CONTENT));
        assert!(!stats.metric_present(tc, HUE));
    }

    #[test]
    fn test_save_and_load_csv_round_trip() {
        let stats = StatsManager::new();
        stats.register_metric_keys(&[CONTENT, HUE]);
        let tc1 = Timecode::from_frames(1, fps());
        let tc2 = Timecode::from_frames(2, fps());
        stats.set_metrics(tc1, &[(CONTENT, 0.0), (HUE, 0.0)]);
        stats.set_metrics(tc2, &[(CONTENT, 27.5), (HUE, 1.25)]);

        let dir = std::env::temp_dir().join(format!("statsmgr_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("stats.csv");

        stats.save_csv(&path, fps()).unwrap();

        let loaded = StatsManager::new();
        loaded.load_csv(&path, fps()).unwrap();

        let row2 = loaded.get_metrics(tc2).unwrap();
        assert_eq!(row2.get("content_val"), Some(&27.5));
        assert_eq!(row2.get("delta_hue"), Some(&1.25));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_csv_tolerates_legacy_header_comment() {
        let dir = std::env::temp_dir().join(format!("statsmgr_legacy_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("legacy.csv");
        std::fs::write(
            &path,
            "# legacy scenedetect stats file\nFrame Number,Timecode,content_val\n1,00:00:00.000,5.0\n",
        )
        .unwrap();

        let stats = StatsManager::new();
        stats.load_csv(&path, fps()).unwrap();
        let row = stats.get_metrics(Timecode::from_frames(1, fps())).unwrap();
        assert_eq!(row.get("content_val"), Some(&5.0));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_csv_discards_unknown_columns() {
        let dir = std::env::temp_dir().join(format!("statsmgr_unknown_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("unknown.csv");
        std::fs::write(&path, "Frame Number,Timecode,content_val,some_future_metric\n1,00:00:00.000,5.0,99.0\n")
            .unwrap();

        let stats = StatsManager::new();
        stats.load_csv(&path, fps()).unwrap();
        let row = stats.get_metrics(Timecode::from_frames(1, fps())).unwrap();
        assert_eq!(row.get("content_val"), Some(&5.0));
        assert_eq!(row.get("some_future_metric"), None);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_register_metric_keys_preserves_first_order() {
        let stats = StatsManager::new();
        stats.register_metric_keys(&[HUE, CONTENT]);
        stats.register_metric_keys(&[CONTENT, HUE]);
        let registered = stats.registered_keys.lock().unwrap();
        assert_eq!(*registered, vec![HUE, CONTENT]);
    }
}
