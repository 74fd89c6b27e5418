//! Equalizer state and file formats for pweq.
//!
//! This crate owns everything pweq keeps on disk and the pure transformations
//! between those files and in-memory gains:
//!
//! - **Gain tables**: the ten fixed bands and a clamped, sparse [`GainTable`]
//! - **Rendering**: [`render`] a table into a PipeWire filter-chain config and
//!   [`write_config`] it atomically
//! - **Parsing**: [`parse_gains`] back out of rendered or hand-edited text
//! - **Presets**: named filter-chain files in a [`PresetStore`]
//! - **Session**: the last applied gains in a [`SessionStore`]
//! - **Paths / settings**: the per-user [`ConfigLayout`] and [`ReloadSettings`]
//!
//! # Example
//!
//! ```rust
//! use pweq_config::{GainTable, parse_gains, render};
//!
//! let gains = GainTable::try_from_pairs([(63, 4.0), (8000, -2.5)]).unwrap();
//! let text = render(&gains);
//!
//! let parsed = parse_gains(&text);
//! assert_eq!(parsed.get(63), Some(4.0));
//! assert_eq!(parsed.get(31), Some(0.0)); // unset bands render flat
//! ```

mod error;
mod gains;
mod parse;
mod preset;
mod session;
mod settings;

/// Filter-chain config rendering.
pub mod render;

/// Per-user file locations.
pub mod paths;

pub use error::{ConfigError, RenderError};
pub use gains::{
    BAND_FREQUENCIES, GAIN_STEP, GainTable, MAX_GAIN, MIN_GAIN, clamp_gain, is_band,
};
pub use parse::{load_gains, parse_gains};
pub use paths::{ConfigLayout, RENDERED_CONFIG_NAME, ensure_dir};
pub use preset::{MAX_PRESET_NAME_LEN, PresetStore, validate_preset_name};
pub use render::{EQ_INPUT_NODE_NAME, EQ_OUTPUT_NODE_NAME, render, write_config};
pub use session::SessionStore;
pub use settings::ReloadSettings;
