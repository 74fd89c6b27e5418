//! Preset management commands.
//!
//! Presets are complete filter-chain files; saving one renders the gains the
//! same way `apply` does, so a preset can also be dropped into
//! `pipewire.conf.d` by hand.

use clap::{Args, Subcommand};

use super::common::{
    Context, apply_with_progress, conclude, parse_band_gain, print_gains, with_overrides,
};

#[derive(Args)]
pub struct PresetsArgs {
    #[command(subcommand)]
    command: PresetsCommand,
}

#[derive(Subcommand)]
enum PresetsCommand {
    /// List saved presets
    List,

    /// Show the gains stored in a preset
    Show {
        /// Preset name
        name: String,
    },

    /// Save gains as a preset
    Save {
        /// Name for the preset (letters, digits, space, '_' and '-')
        name: String,

        /// Band gain as FREQ=GAIN in dB (repeatable)
        #[arg(short, long = "gain", value_name = "FREQ=GAIN", value_parser = parse_band_gain)]
        gains: Vec<(u32, f32)>,

        /// Start from the last applied gains
        #[arg(short, long)]
        session: bool,

        /// Overwrite if the preset already exists
        #[arg(long)]
        force: bool,
    },

    /// Delete a preset
    Delete {
        /// Preset name to delete
        name: String,
    },

    /// Apply a preset and reload PipeWire
    Apply {
        /// Preset name
        name: String,
    },

    /// Show the presets directory
    Path,
}

pub fn run(ctx: &Context, args: PresetsArgs) -> anyhow::Result<()> {
    match args.command {
        PresetsCommand::List => list_presets(ctx),
        PresetsCommand::Show { name } => show_preset(ctx, &name),
        PresetsCommand::Save {
            name,
            gains,
            session,
            force,
        } => save_preset(ctx, &name, &gains, session, force),
        PresetsCommand::Delete { name } => delete_preset(ctx, &name),
        PresetsCommand::Apply { name } => apply_preset(ctx, &name),
        PresetsCommand::Path => {
            println!("{}", ctx.presets().dir().display());
            Ok(())
        }
    }
}

fn list_presets(ctx: &Context) -> anyhow::Result<()> {
    let names = ctx.presets().list();
    if names.is_empty() {
        println!("No presets saved.");
        println!();
        println!("Create one with: pweq presets save <name> -g 1000=3");
        return Ok(());
    }
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

fn show_preset(ctx: &Context, name: &str) -> anyhow::Result<()> {
    let gains = ctx.presets().load(name)?;
    println!("Preset: {}", name);
    println!("{}", "=".repeat(8 + name.len()));
    print_gains(&gains);
    Ok(())
}

fn save_preset(
    ctx: &Context,
    name: &str,
    overrides: &[(u32, f32)],
    from_session: bool,
    force: bool,
) -> anyhow::Result<()> {
    let store = ctx.presets();

    if store.exists(name) && !force {
        anyhow::bail!(
            "Preset '{}' already exists. Use --force to overwrite.",
            name
        );
    }

    let base = if from_session {
        ctx.session().load()?
    } else {
        pweq_config::GainTable::new()
    };
    let gains = with_overrides(base, overrides)?;

    let path = store.save(name, &gains)?;
    println!("Saved preset '{}' to {}", name, path.display());
    Ok(())
}

fn delete_preset(ctx: &Context, name: &str) -> anyhow::Result<()> {
    ctx.presets().delete(name)?;
    println!("Deleted preset '{}'", name);
    Ok(())
}

fn apply_preset(ctx: &Context, name: &str) -> anyhow::Result<()> {
    let gains = ctx.presets().load(name)?;
    tracing::info!(preset = name, "applying preset");
    let report = apply_with_progress(ctx, gains)?;
    conclude(ctx, &report)
}
