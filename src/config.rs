//! INI-style configuration file support (spec §6 "Configuration file").
//!
//! Recognized sections: `[global]`, `[detect-content]`, `[detect-adaptive]`,
//! `[detect-threshold]`, `[detect-hist]`, `[detect-hash]`, `[split-video]`,
//! `[save-images]`, `[list-scenes]`. Values are read as plain strings here;
//! typed accessors parse individual keys on demand so a malformed single
//! value degrades to its built-in default with a warning rather than
//! failing the whole load. Precedence for any one setting is CLI argument
//! > config file > built-in default — this type only represents the
//! middle tier; combining it with CLI overrides is the caller's job (see
//! `crate::cli`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ini::Ini;
use tracing::{debug, warn};

use crate::error::{Result, SceneDetectError};

/// Alias kept distinct from the general [`SceneDetectError`] surface so
/// config-loading call sites read as operating on config-specific failures,
/// even though today it is the same `InvalidConfig`/`IoError` variants.
pub type ConfigError = SceneDetectError;

const KNOWN_SECTIONS: &[&str] =
    &["global", "detect-content", "detect-adaptive", "detect-threshold", "detect-hist", "detect-hash", "split-video", "save-images", "list-scenes"];

/// A parsed configuration file, as a flat `section -> key -> value` string
/// table.
#[derive(Debug, Clone, Default)]
pub struct Config {
    sections: HashMap<String, HashMap<String, String>>,
}

impl Config {
    /// An empty configuration; every lookup falls through to its default.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load an INI file. Unknown sections produce a warning and are kept
    /// (so their keys are still readable, just not validated against the
    /// recognized set) unless `strict` is set, in which case an unknown
    /// section is a `ConfigError`.
    pub fn load(path: impl AsRef<Path>, strict: bool) -> Result<Self> {
        let path = path.as_ref();
        let ini = Ini::load_from_file(path)
            .map_err(|e| SceneDetectError::config_error(format!("failed to parse config file {}: {e}", path.display())))?;

        let mut sections = HashMap::new();
        for (section, properties) in ini.iter() {
            let name = section.unwrap_or("global").to_string();
            if !KNOWN_SECTIONS.contains(&name.as_str()) {
                let message = format!("unknown configuration section '[{name}]' in {}", path.display());
                if strict {
                    return Err(SceneDetectError::config_error(message));
                }
                warn!("{message}");
            }

            let kv = sections.entry(name).or_insert_with(HashMap::new);
            for (key, value) in properties.iter() {
                let kv: &mut HashMap<String, String> = kv;
                kv.insert(key.to_string(), value.to_string());
            }
        }

        debug!("Loaded configuration from {}", path.display());
        Ok(Self { sections })
    }

    /// The default per-user config path: explicit `--config` wins over
    /// this at the call site, per spec's lookup order.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("scenedetect").join("scenedetect.cfg"))
    }

    fn raw(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section).and_then(|kv| kv.get(key)).map(String::as_str)
    }

    pub fn get_str(&self, section: &str, key: &str, default: &str) -> String {
        self.raw(section, key).unwrap_or(default).to_string()
    }

    pub fn get_f64(&self, section: &str, key: &str, default: f64) -> f64 {
        match self.raw(section, key) {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("invalid numeric value '{raw}' for [{section}] {key}, using default {default}");
                default
            }),
            None => default,
        }
    }

    pub fn get_u32(&self, section: &str, key: &str, default: u32) -> u32 {
        match self.raw(section, key) {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("invalid integer value '{raw}' for [{section}] {key}, using default {default}");
                default
            }),
            None => default,
        }
    }

    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        match self.raw(section, key) {
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" | "on" => true,
                "false" | "no" | "0" | "off" => false,
                _ => {
                    warn!("invalid boolean value '{raw}' for [{section}] {key}, using default {default}");
                    default
                }
            },
            None => default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(contents: &str, name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("scenedetect_config_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_and_typed_accessors() {
        let path = write_temp(
            "[global]\nmin-scene-len = 0.6s\ndrop-short-scenes = yes\n\n[detect-content]\nthreshold = 32.0\n",
            "basic.cfg",
        );
        let config = Config::load(&path, false).unwrap();
        assert_eq!(config.get_str("global", "min-scene-len", "0"), "0.6s");
        assert!(config.get_bool("global", "drop-short-scenes", false));
        assert_eq!(config.get_f64("detect-content", "threshold", 27.0), 32.0);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_key_falls_back_to_default() {
        let config = Config::empty();
        assert_eq!(config.get_f64("detect-content", "threshold", 27.0), 27.0);
        assert!(!config.get_bool("global", "drop-short-scenes", false));
    }

    #[test]
    fn test_malformed_numeric_value_falls_back_with_warning() {
        let path = write_temp("[detect-content]\nthreshold = not-a-number\n", "malformed.cfg");
        let config = Config::load(&path, false).unwrap();
        assert_eq!(config.get_f64("detect-content", "threshold", 27.0), 27.0);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_unknown_section_strict_errors() {
        let path = write_temp("[not-a-real-section]\nfoo = bar\n", "unknown.cfg");
        let err = Config::load(&path, true).unwrap_err();
        assert!(matches!(err, SceneDetectError::InvalidConfig { .. }));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_unknown_section_non_strict_warns_and_keeps_keys() {
        let path = write_temp("[not-a-real-section]\nfoo = bar\n", "unknown_lenient.cfg");
        let config = Config::load(&path, false).unwrap();
        assert_eq!(config.get_str("not-a-real-section", "foo", ""), "bar");
        std::fs::remove_file(&path).ok();
    }
}
