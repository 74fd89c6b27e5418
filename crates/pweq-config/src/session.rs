//! Session persistence: the last applied gains, restored on the next run.
//!
//! Independent of the rendered config so a session survives the rendered file
//! being removed or hand-edited.
//!
//! # TOML Format
//!
//! ```toml
//! [equalizer]
//! gain_31hz = 0.0
//! gain_1000hz = 2.5
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::gains::GainTable;
use crate::paths::ensure_dir;
use crate::render::write_atomic;

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default)]
    equalizer: BTreeMap<String, toml::Value>,
}

fn key_for(freq: u32) -> String {
    format!("gain_{freq}hz")
}

fn freq_from_key(key: &str) -> Option<u32> {
    key.strip_prefix("gain_")?.strip_suffix("hz")?.parse().ok()
}

/// Key-value store for the gains-by-frequency mapping.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store backed by the TOML file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored gains.
    ///
    /// A missing file is an empty table. Unrecognised keys and non-numeric
    /// values are skipped with a warning; gains are clamped.
    pub fn load(&self) -> Result<GainTable, ConfigError> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no session file");
            return Ok(GainTable::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| ConfigError::read_file(&self.path, e))?;
        Self::from_toml(&content)
    }

    /// Parse session TOML.
    pub fn from_toml(content: &str) -> Result<GainTable, ConfigError> {
        let file: SessionFile = toml::from_str(content)?;
        let mut gains = GainTable::new();

        for (key, value) in &file.equalizer {
            let Some(freq) = freq_from_key(key) else {
                tracing::warn!(key = key.as_str(), "unrecognised session key");
                continue;
            };
            let gain = match value {
                toml::Value::Float(f) => *f as f32,
                toml::Value::Integer(i) => *i as f32,
                other => {
                    tracing::warn!(key = key.as_str(), value = %other, "non-numeric session gain");
                    continue;
                }
            };
            if let Err(e) = gains.set(freq, gain) {
                tracing::warn!(key = key.as_str(), "skipping session entry: {e}");
            }
        }
        Ok(gains)
    }

    /// Serialize `gains` to session TOML.
    pub fn to_toml(gains: &GainTable) -> Result<String, ConfigError> {
        let file = SessionFile {
            equalizer: gains
                .iter()
                .map(|(f, g)| {
                    // Keep the file at the table's 0.1 dB resolution.
                    let g = (f64::from(g) * 10.0).round() / 10.0;
                    (key_for(f), toml::Value::Float(g))
                })
                .collect(),
        };
        Ok(toml::to_string_pretty(&file)?)
    }

    /// Replace the stored gains.
    pub fn save(&self, gains: &GainTable) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        write_atomic(&self.path, &Self::to_toml(gains)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn key_mapping() {
        assert_eq!(key_for(1000), "gain_1000hz");
        assert_eq!(freq_from_key("gain_1000hz"), Some(1000));
        assert_eq!(freq_from_key("gain_xhz"), None);
        assert_eq!(freq_from_key("volume"), None);
    }

    #[test]
    fn missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path().join("session.toml"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path().join("sub").join("session.toml"));
        let gains = GainTable::try_from_pairs([(31, -1.5), (16000, 6.0)]).unwrap();
        store.save(&gains).unwrap();
        assert_eq!(store.load().unwrap(), gains);
    }

    #[test]
    fn clamps_and_skips_garbage() {
        let gains = SessionStore::from_toml(
            r#"
[equalizer]
gain_31hz = 40.0
gain_63hz = -3
gain_125hz = "loud"
gain_60hz = 1.0
volume = 2.0
"#,
        )
        .unwrap();
        assert_eq!(gains.get(31), Some(12.0));
        assert_eq!(gains.get(63), Some(-3.0));
        assert_eq!(gains.get(125), None);
        assert_eq!(gains.len(), 2);
    }

    #[test]
    fn missing_section_is_empty() {
        assert!(SessionStore::from_toml("other = 1").unwrap().is_empty());
    }

    #[test]
    fn invalid_toml_is_error() {
        assert!(matches!(
            SessionStore::from_toml("[equalizer"),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn to_toml_uses_equalizer_table() {
        let gains = GainTable::try_from_pairs([(1000, 2.5)]).unwrap();
        let text = SessionStore::to_toml(&gains).unwrap();
        assert!(text.contains("[equalizer]"), "got: {text}");
        assert!(text.contains("gain_1000hz = 2.5"), "got: {text}");
    }
}
