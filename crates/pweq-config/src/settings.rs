//! Reload timing settings.
//!
//! Every field has a default, so an absent file, an empty file or a file
//! setting a single key are all valid.
//!
//! # TOML Format
//!
//! ```toml
//! probe_timeout_ms = 3000
//! full_ready_timeout_ms = 20000
//! debounce_ms = 500
//! debounce_max_ms = 3000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Timeouts and intervals for probing and reloading the audio server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReloadSettings {
    /// Bound on each read-only query command.
    pub probe_timeout_ms: u64,
    /// Bound on each reload action command (signal, restart, module load).
    pub action_timeout_ms: u64,
    /// Readiness wait after a signal reload.
    pub signal_ready_timeout_ms: u64,
    /// Readiness wait after restarting the compatibility service.
    pub compat_ready_timeout_ms: u64,
    /// Readiness wait after a full server restart.
    pub full_ready_timeout_ms: u64,
    /// Interval between readiness polls.
    pub poll_interval_ms: u64,
    /// Quiet period before a burst of edits is applied.
    pub debounce_ms: u64,
    /// Longest an edit waits for a quiet period before it is applied anyway.
    pub debounce_max_ms: u64,
}

impl Default for ReloadSettings {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 3_000,
            action_timeout_ms: 15_000,
            signal_ready_timeout_ms: 5_000,
            compat_ready_timeout_ms: 8_000,
            full_ready_timeout_ms: 15_000,
            poll_interval_ms: 200,
            debounce_ms: 300,
            debounce_max_ms: 2_000,
        }
    }
}

impl ReloadSettings {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Load settings from `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse settings from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Bound on each read-only query command.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Bound on each reload action command.
    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }

    /// Readiness wait after a signal reload.
    pub fn signal_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.signal_ready_timeout_ms)
    }

    /// Readiness wait after restarting the compatibility service.
    pub fn compat_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.compat_ready_timeout_ms)
    }

    /// Readiness wait after a full restart.
    pub fn full_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.full_ready_timeout_ms)
    }

    /// Interval between readiness polls (at least 1 ms).
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Quiet period before a burst of edits is applied.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Upper bound on how long continuous edits can defer a reload; never
    /// shorter than [`debounce`](Self::debounce).
    pub fn debounce_max(&self) -> Duration {
        Duration::from_millis(self.debounce_max_ms.max(self.debounce_ms))
    }
}
