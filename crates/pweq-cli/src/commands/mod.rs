//! CLI command implementations.

pub mod apply;
pub mod common;
pub mod presets;
pub mod render;
pub mod status;
pub mod tune;
