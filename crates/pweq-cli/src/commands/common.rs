//! Shared CLI helpers used across multiple commands.

use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use pweq_config::{ConfigLayout, GainTable, PresetStore, ReloadSettings, SessionStore, is_band};
use pweq_pipewire::{
    ApplyReport, PipeWireServer, Phase, ReloadOrchestrator, STRATEGY_LADDER,
};

/// Paths and settings resolved from the global options.
pub struct Context {
    pub layout: ConfigLayout,
    pub settings: ReloadSettings,
}

impl Context {
    /// Resolve the layout, then load settings from `settings_file` or the
    /// layout's default location.
    pub fn new(config_root: Option<PathBuf>, settings_file: Option<&Path>) -> anyhow::Result<Self> {
        let layout = config_root.map_or_else(ConfigLayout::user, ConfigLayout::new);
        let settings = match settings_file {
            Some(path) => ReloadSettings::load(path)?,
            None => ReloadSettings::load_or_default(layout.settings_path())?,
        };
        tracing::debug!(root = %layout.root().display(), ?settings, "configuration");
        Ok(Self { layout, settings })
    }

    pub fn presets(&self) -> PresetStore {
        PresetStore::new(self.layout.presets_dir())
    }

    pub fn session(&self) -> SessionStore {
        SessionStore::new(self.layout.session_path())
    }

    pub fn server(&self) -> PipeWireServer {
        PipeWireServer::system(self.settings.clone())
    }

    pub fn orchestrator(&self) -> ReloadOrchestrator<PipeWireServer> {
        ReloadOrchestrator::new(
            self.server(),
            self.layout.rendered_config_path(),
            self.settings.clone(),
        )
    }
}

/// Parse a `FREQ=GAIN` band assignment for clap's `value_parser`.
///
/// The frequency may carry an `Hz` suffix (`1000Hz=3`).
pub fn parse_band_gain(s: &str) -> Result<(u32, f32), String> {
    let Some((freq, gain)) = s.split_once('=') else {
        return Err(format!(
            "Invalid band format: '{}' (expected FREQ=GAIN, e.g. 1000=3.5)",
            s
        ));
    };
    let freq = parse_band(freq)?;
    let gain: f32 = gain
        .trim()
        .parse()
        .map_err(|_| format!("Invalid gain '{}' for {} Hz", gain.trim(), freq))?;
    if !gain.is_finite() {
        return Err(format!("Gain for {} Hz must be a finite number", freq));
    }
    Ok((freq, gain))
}

/// Parse a band frequency, accepting an optional `Hz` suffix.
pub fn parse_band(s: &str) -> Result<u32, String> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_suffix("Hz")
        .or_else(|| trimmed.strip_suffix("hz"))
        .unwrap_or(trimmed)
        .trim();
    let freq: u32 = digits
        .parse()
        .map_err(|_| format!("Invalid frequency: '{}'", trimmed))?;
    if !is_band(freq) {
        return Err(format!(
            "{} Hz is not an equalizer band (bands: {})",
            freq,
            band_list()
        ));
    }
    Ok(freq)
}

fn band_list() -> String {
    pweq_config::BAND_FREQUENCIES
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Overlay `overrides` onto `base`.
pub fn with_overrides(mut base: GainTable, overrides: &[(u32, f32)]) -> anyhow::Result<GainTable> {
    for &(freq, gain) in overrides {
        base.set(freq, gain)?;
    }
    Ok(base)
}

/// Print all ten bands, one per line.
pub fn print_gains(gains: &GainTable) {
    for (freq, gain) in gains.bands() {
        let marker = if gains.get(freq).is_some() { "" } else { "  (unset)" };
        println!("  {:>6} Hz  {:+5.1} dB{}", freq, gain, marker);
    }
}

/// Run one reload cycle with a spinner tracking its phase.
pub fn apply_with_progress(ctx: &Context, gains: GainTable) -> anyhow::Result<ApplyReport> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));

    let observer = pb.clone();
    let orchestrator = ctx.orchestrator().with_phase_observer(move |phase| {
        let msg = match phase {
            Phase::Rendering => "writing filter-chain config".to_string(),
            Phase::AttemptingStrategy(k) => format!("reloading PipeWire ({})", STRATEGY_LADDER[k]),
            Phase::Verifying => "verifying equalizer node".to_string(),
            Phase::Done { .. } => "done".to_string(),
        };
        observer.set_message(msg);
    });

    let report = orchestrator.apply(gains);
    pb.finish_and_clear();
    Ok(report)
}

/// Persist the session after a successful cycle and turn the report into
/// the command's result.
pub fn conclude(ctx: &Context, report: &ApplyReport) -> anyhow::Result<()> {
    if report.is_success() {
        ctx.session().save(&report.gains)?;
        println!("{}", report.message());
        Ok(())
    } else {
        let tried = report
            .attempts
            .iter()
            .map(|s| s.name())
            .collect::<Vec<_>>()
            .join(", ");
        if tried.is_empty() {
            anyhow::bail!("{}", report.message());
        }
        anyhow::bail!("{} (tried: {})", report.message(), tried)
    }
}
