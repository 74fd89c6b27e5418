//! Per-user file locations.
//!
//! Everything lives under PipeWire's user configuration directory so the
//! rendered filter chain lands where the server's drop-in loader looks for it.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/pipewire/
//! ├── pipewire.conf.d/
//! │   └── 99-pweq.conf        rendered filter chain (read by PipeWire)
//! ├── pweq-presets/
//! │   └── <name>.conf         saved presets
//! ├── pweq-session.toml       last applied gains
//! └── pweq.toml               reload settings (optional)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use pweq_config::ConfigLayout;
//!
//! let layout = ConfigLayout::user();
//! layout.ensure_dirs().unwrap();
//! println!("rendered config: {}", layout.rendered_config_path().display());
//! ```

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// PipeWire's directory name under the user config dir.
const PIPEWIRE_DIR: &str = "pipewire";

/// Drop-in directory PipeWire scans for `*.conf` fragments.
const FILTER_CHAIN_SUBDIR: &str = "pipewire.conf.d";

/// Name of the rendered filter-chain fragment. The `99-` prefix sorts it last.
pub const RENDERED_CONFIG_NAME: &str = "99-pweq.conf";

const PRESETS_SUBDIR: &str = "pweq-presets";
const SESSION_FILE: &str = "pweq-session.toml";
const SETTINGS_FILE: &str = "pweq.toml";

/// Resolves every file pweq reads or writes relative to one root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLayout {
    root: PathBuf,
}

impl ConfigLayout {
    /// Layout rooted at an arbitrary directory (tests, `--config-root`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout rooted at `~/.config/pipewire` (or the platform equivalent).
    ///
    /// Falls back to `./pipewire` if the config directory cannot be determined.
    pub fn user() -> Self {
        Self::new(
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(PIPEWIRE_DIR),
        )
    }

    /// Root directory of the layout.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the rendered config.
    pub fn filter_chain_dir(&self) -> PathBuf {
        self.root.join(FILTER_CHAIN_SUBDIR)
    }

    /// Path of the rendered filter-chain config.
    pub fn rendered_config_path(&self) -> PathBuf {
        self.filter_chain_dir().join(RENDERED_CONFIG_NAME)
    }

    /// Directory holding saved presets.
    pub fn presets_dir(&self) -> PathBuf {
        self.root.join(PRESETS_SUBDIR)
    }

    /// Path of the session file restoring the last applied gains.
    pub fn session_path(&self) -> PathBuf {
        self.root.join(SESSION_FILE)
    }

    /// Path of the optional reload settings file.
    pub fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    /// Create the filter-chain and presets directories if missing.
    pub fn ensure_dirs(&self) -> Result<(), ConfigError> {
        ensure_dir(&self.filter_chain_dir())?;
        ensure_dir(&self.presets_dir())?;
        Ok(())
    }
}

impl Default for ConfigLayout {
    fn default() -> Self {
        Self::user()
    }
}

/// Create `dir` and its parents if it does not exist.
pub fn ensure_dir(dir: &Path) -> Result<(), ConfigError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::create_dir(dir, e))?;
        tracing::info!(dir = %dir.display(), "created directory");
    }
    Ok(())
}
