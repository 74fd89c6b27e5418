//! pweq - 10-band equalizer for PipeWire.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pweq")]
#[command(author, version, about = "10-band PipeWire equalizer", long_about = None)]
struct Cli {
    /// PipeWire user config directory (default: ~/.config/pipewire)
    #[arg(long, global = true, value_name = "DIR")]
    config_root: Option<PathBuf>,

    /// Reload settings file (default: <config-root>/pweq.toml)
    #[arg(long, global = true, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render gains into the filter-chain config and reload PipeWire
    Apply(commands::apply::ApplyArgs),

    /// Print or write the filter-chain config without touching PipeWire
    Render(commands::render::RenderArgs),

    /// Show the state of PipeWire and the equalizer
    Status(commands::status::StatusArgs),

    /// Apply a flat response
    Reset,

    /// List and manage presets
    Presets(commands::presets::PresetsArgs),

    /// Adjust gains interactively from stdin
    Tune,
}

fn main() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let ctx = commands::common::Context::new(cli.config_root, cli.settings.as_deref())?;

    match cli.command {
        Commands::Apply(args) => commands::apply::run(&ctx, args),
        Commands::Render(args) => commands::render::run(&ctx, args),
        Commands::Status(args) => commands::status::run(&ctx, args),
        Commands::Reset => commands::apply::reset(&ctx),
        Commands::Presets(args) => commands::presets::run(&ctx, args),
        Commands::Tune => commands::tune::run(&ctx),
    }
}
