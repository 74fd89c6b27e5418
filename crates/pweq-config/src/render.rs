//! Filter-chain config rendering.
//!
//! Turns a [`GainTable`] into the drop-in configuration PipeWire loads from
//! `pipewire.conf.d`. The output declares a stereo virtual sink/source pair
//! with fixed node names and one builtin `param_eq` node carrying ten
//! `bq_peaking` filters, one per band, in ascending frequency order.

use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::error::RenderError;
use crate::gains::GainTable;

/// `node.name` of the equalizer's virtual sink (the node applications play into).
pub const EQ_INPUT_NODE_NAME: &str = "effect_input.pweq";

/// `node.name` of the equalizer's playback stream towards the real device.
pub const EQ_OUTPUT_NODE_NAME: &str = "effect_output.pweq";

/// Human-readable description shown by mixers for the equalizer sink.
pub const EQ_NODE_DESCRIPTION: &str = "PWEQ Equalizer Sink";

/// Quality factor applied to every peaking filter.
pub const FILTER_Q: f32 = 0.707;

/// Filter type emitted for each band.
pub const PEAKING_FILTER: &str = "bq_peaking";

/// Render a single band descriptor.
///
/// ```rust
/// use pweq_config::render::filter_descriptor;
///
/// assert_eq!(
///     filter_descriptor(1000, 2.5),
///     "{ type = bq_peaking, freq = 1000, gain = 2.5, q = 0.707 }"
/// );
/// ```
pub fn filter_descriptor(freq: u32, gain: f32) -> String {
    format!("{{ type = {PEAKING_FILTER}, freq = {freq}, gain = {gain:.1}, q = {FILTER_Q} }}")
}

/// Render the complete filter-chain configuration for `gains`.
///
/// Bands absent from `gains` are emitted flat (`gain = 0.0`). The output is a
/// pure function of the table.
pub fn render(gains: &GainTable) -> String {
    let mut filters = String::new();
    for (freq, gain) in gains.bands() {
        // Writing into a String cannot fail.
        let _ = writeln!(
            filters,
            "                                {}",
            filter_descriptor(freq, gain)
        );
    }

    format!(
        r#"# Generated by pweq. This file is overwritten on every apply.
context.modules = [
    {{   name = libpipewire-module-filter-chain
        args = {{
            node.description = "{EQ_NODE_DESCRIPTION}"
            media.name       = "{EQ_NODE_DESCRIPTION}"
            filter.graph = {{
                nodes = [
                    {{
                        type  = builtin
                        name  = eq
                        label = param_eq
                        config = {{
                            filters = [
{filters}                            ]
                        }}
                    }}
                ]
                inputs  = [ "eq:In 1" "eq:In 2" ]
                outputs = [ "eq:Out 1" "eq:Out 2" ]
            }}
            audio.channels = 2
            audio.position = [ FL FR ]
            capture.props = {{
                node.name   = "{EQ_INPUT_NODE_NAME}"
                media.class = Audio/Sink
            }}
            playback.props = {{
                node.name    = "{EQ_OUTPUT_NODE_NAME}"
                node.passive = true
            }}
        }}
    }}
]
"#
    )
}

/// Render `gains` and replace the file at `path` with the result.
///
/// The text is written to a hidden sibling file, flushed to disk and renamed
/// over `path`, so a concurrent reader sees either the old or the new file in
/// full. The parent directory must already exist.
pub fn write_config(path: impl AsRef<Path>, gains: &GainTable) -> Result<(), RenderError> {
    write_atomic(path.as_ref(), &render(gains))
}

/// Replace `path` with `content` via temp file + rename in the same directory.
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<(), RenderError> {
    let tmp = temp_path_for(path);

    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if let Err(e) = result {
        // Best effort: the temp file may not exist if creation itself failed.
        let _ = fs::remove_file(&tmp);
        return Err(RenderError::write_file(path, e));
    }

    tracing::debug!(path = %path.display(), bytes = content.len(), "config written");
    Ok(())
}

/// Hidden temp name next to `path`, without the `.conf` suffix so PipeWire
/// never picks it up.
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "config".to_string());
    path.with_file_name(format!(".{name}.tmp-{}", std::process::id()))
}
