//! Render command: produce the filter-chain config without reloading.

use std::path::PathBuf;

use clap::Args;
use pweq_config::{GainTable, render, write_config};

use super::common::{Context, parse_band_gain, with_overrides};

#[derive(Args)]
pub struct RenderArgs {
    /// Band gain as FREQ=GAIN in dB (repeatable)
    #[arg(short, long = "gain", value_name = "FREQ=GAIN", value_parser = parse_band_gain)]
    gains: Vec<(u32, f32)>,

    /// Start from a saved preset
    #[arg(short, long)]
    preset: Option<String>,

    /// Write to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

pub fn run(ctx: &Context, args: RenderArgs) -> anyhow::Result<()> {
    let base = match &args.preset {
        Some(name) => ctx.presets().load(name)?,
        None => GainTable::new(),
    };
    let gains = with_overrides(base, &args.gains)?;

    match &args.output {
        Some(path) => {
            write_config(path, &gains)?;
            eprintln!("Wrote {}", path.display());
        }
        None => print!("{}", render(&gains)),
    }
    Ok(())
}
