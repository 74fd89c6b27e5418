//! Apply and reset commands.

use clap::Args;
use pweq_config::GainTable;

use super::common::{Context, apply_with_progress, conclude, parse_band_gain, with_overrides};

#[derive(Args)]
pub struct ApplyArgs {
    /// Band gain as FREQ=GAIN in dB (repeatable), e.g. -g 63=4 -g 8000=-2.5
    #[arg(short, long = "gain", value_name = "FREQ=GAIN", value_parser = parse_band_gain)]
    gains: Vec<(u32, f32)>,

    /// Start from a saved preset
    #[arg(short, long, conflicts_with = "session")]
    preset: Option<String>,

    /// Start from the last applied gains
    #[arg(short, long)]
    session: bool,
}

pub fn run(ctx: &Context, args: ApplyArgs) -> anyhow::Result<()> {
    let base = if let Some(name) = &args.preset {
        ctx.presets().load(name)?
    } else if args.session {
        ctx.session().load()?
    } else {
        GainTable::new()
    };

    let gains = with_overrides(base, &args.gains)?;
    tracing::info!(bands = gains.len(), "applying equalizer");

    let report = apply_with_progress(ctx, gains)?;
    conclude(ctx, &report)
}

pub fn reset(ctx: &Context) -> anyhow::Result<()> {
    let report = apply_with_progress(ctx, GainTable::flat())?;
    conclude(ctx, &report)
}
