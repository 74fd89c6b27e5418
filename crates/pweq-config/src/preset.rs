//! Named presets stored as filter-chain files.
//!
//! A preset is the same text PipeWire loads (see [`render`](crate::render)),
//! so a preset file can be dropped into `pipewire.conf.d` by hand and any
//! rendered config can be saved as a preset. Loading goes through the
//! permissive parser, which also accepts the older quoted preset spelling.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::gains::GainTable;
use crate::parse::load_gains;
use crate::paths::{RENDERED_CONFIG_NAME, ensure_dir};
use crate::render::{render, write_atomic};

/// File extension for presets.
pub const PRESET_EXTENSION: &str = "conf";

/// Longest accepted preset name, in characters.
pub const MAX_PRESET_NAME_LEN: usize = 50;

/// File stems that are never presets: neither saved nor listed.
const RESERVED_STEMS: &[&str] = &["temp", "pipewire"];

fn is_reserved(stem: &str) -> bool {
    let rendered = RENDERED_CONFIG_NAME
        .strip_suffix(".conf")
        .unwrap_or(RENDERED_CONFIG_NAME);
    RESERVED_STEMS
        .iter()
        .chain(std::iter::once(&rendered))
        .any(|r| r.eq_ignore_ascii_case(stem))
}

/// Check a preset name: non-empty, at most [`MAX_PRESET_NAME_LEN`]
/// characters, only alphanumerics, `_`, `-` and spaces, and not one of the
/// reserved file stems.
pub fn validate_preset_name(name: &str) -> Result<(), ConfigError> {
    let valid = !name.trim().is_empty()
        && !is_reserved(name)
        && name.chars().count() <= MAX_PRESET_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | ' '));
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidPresetName(name.to_string()))
    }
}

/// Directory of `<name>.conf` preset files.
#[derive(Debug, Clone)]
pub struct PresetStore {
    dir: PathBuf,
}

impl PresetStore {
    /// Store backed by `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory backing the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a preset with `name` is stored at.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, ConfigError> {
        validate_preset_name(name)?;
        Ok(self.dir.join(format!("{name}.{PRESET_EXTENSION}")))
    }

    /// Sorted names of all presets.
    ///
    /// Returns an empty list if the directory doesn't exist or can't be read.
    pub fn list(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path.extension().is_some_and(|ext| ext == PRESET_EXTENSION)
            })
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .filter(|stem| !is_reserved(stem))
            .collect();
        names.sort();
        names
    }

    /// Check whether a preset exists.
    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_ok_and(|p| p.is_file())
    }

    /// Save `gains` under `name`, replacing any existing preset.
    pub fn save(&self, name: &str, gains: &GainTable) -> Result<PathBuf, ConfigError> {
        let path = self.path_for(name)?;
        ensure_dir(&self.dir)?;
        write_atomic(&path, &render(gains))?;
        tracing::info!(preset = name, path = %path.display(), "preset saved");
        Ok(path)
    }

    /// Load the gains stored under `name`.
    pub fn load(&self, name: &str) -> Result<GainTable, ConfigError> {
        let path = self.path_for(name)?;
        if !path.is_file() {
            return Err(ConfigError::PresetNotFound(name.to_string()));
        }
        let gains = load_gains(&path)?;
        if gains.is_empty() {
            tracing::warn!(preset = name, "preset contains no filters");
        }
        Ok(gains)
    }

    /// Delete the preset stored under `name`.
    pub fn delete(&self, name: &str) -> Result<(), ConfigError> {
        let path = self.path_for(name)?;
        if !path.is_file() {
            return Err(ConfigError::PresetNotFound(name.to_string()));
        }
        std::fs::remove_file(&path).map_err(|e| ConfigError::write_file(&path, e))?;
        tracing::info!(preset = name, "preset deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn name_validation() {
        assert!(validate_preset_name("Rock").is_ok());
        assert!(validate_preset_name("My Rock_2-loud").is_ok());
        assert!(validate_preset_name(&"a".repeat(50)).is_ok());

        assert!(validate_preset_name("").is_err());
        assert!(validate_preset_name("   ").is_err());
        assert!(validate_preset_name(&"a".repeat(51)).is_err());
        assert!(validate_preset_name("../escape").is_err());
        assert!(validate_preset_name("a/b").is_err());
        assert!(validate_preset_name("dot.name").is_err());
    }

    #[test]
    fn reserved_names_cannot_be_saved() {
        let temp = TempDir::new().unwrap();
        let store = PresetStore::new(temp.path());
        for name in ["temp", "pipewire", "PipeWire", "99-pweq"] {
            assert!(
                matches!(
                    store.save(name, &GainTable::new()),
                    Err(ConfigError::InvalidPresetName(_))
                ),
                "{name} should be rejected"
            );
        }
        assert!(store.list().is_empty());

        // Anything that saves also lists.
        store.save("temperature", &GainTable::new()).unwrap();
        assert_eq!(store.list(), vec!["temperature".to_string()]);
    }

    #[test]
    fn save_load_delete() {
        let temp = TempDir::new().unwrap();
        let store = PresetStore::new(temp.path().join("presets"));
        let gains = GainTable::try_from_pairs([(63, 4.0), (8000, -2.5)]).unwrap();

        let path = store.save("Bass Boost", &gains).unwrap();
        assert!(path.ends_with("Bass Boost.conf"));
        assert!(store.exists("Bass Boost"));

        let loaded = store.load("Bass Boost").unwrap();
        assert_eq!(loaded.get(63), Some(4.0));
        assert_eq!(loaded.get(8000), Some(-2.5));
        assert_eq!(loaded.get(31), Some(0.0));

        store.delete("Bass Boost").unwrap();
        assert!(!store.exists("Bass Boost"));
    }

    #[test]
    fn list_is_sorted_and_filtered() {
        let temp = TempDir::new().unwrap();
        let store = PresetStore::new(temp.path());
        fs::write(temp.path().join("zeta.conf"), "").unwrap();
        fs::write(temp.path().join("alpha.conf"), "").unwrap();
        fs::write(temp.path().join("temp.conf"), "").unwrap();
        fs::write(temp.path().join("99-pweq.conf"), "").unwrap();
        fs::write(temp.path().join("notes.txt"), "").unwrap();

        assert_eq!(store.list(), vec!["alpha".to_string(), "zeta".to_string()]);
    }

    #[test]
    fn list_missing_dir_is_empty() {
        let store = PresetStore::new("/nonexistent/pweq/presets/12345");
        assert!(store.list().is_empty());
    }

    #[test]
    fn load_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let store = PresetStore::new(temp.path());
        assert!(matches!(
            store.load("ghost"),
            Err(ConfigError::PresetNotFound(_))
        ));
        assert!(matches!(
            store.delete("ghost"),
            Err(ConfigError::PresetNotFound(_))
        ));
    }

    #[test]
    fn invalid_name_rejected_before_io() {
        let temp = TempDir::new().unwrap();
        let store = PresetStore::new(temp.path());
        assert!(matches!(
            store.save("../../etc/x", &GainTable::new()),
            Err(ConfigError::InvalidPresetName(_))
        ));
    }

    #[test]
    fn loads_legacy_quoted_preset() {
        let temp = TempDir::new().unwrap();
        let store = PresetStore::new(temp.path());
        fs::write(
            temp.path().join("old.conf"),
            "# Preset File\n{ \"type\": \"bq_peaking\", \"freq\": 1000, \"gain\": 2.5, \"q\": 0.707 }",
        )
        .unwrap();
        let gains = store.load("old").unwrap();
        assert_eq!(gains.len(), 1);
        assert_eq!(gains.get(1000), Some(2.5));
    }
}
