//! Reload strategies, least disruptive first.

use std::fmt;
use std::time::Duration;

use pweq_config::ReloadSettings;
use serde::Serialize;

use crate::probe::AudioServer;

/// One way of getting the audio server to pick up a new config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Send `SIGHUP` to the server process. Keeps the equalizer node alive, so
    /// applications routed to it keep playing.
    SignalReload,
    /// Restart only the PulseAudio compatibility service.
    ScopedRestart,
    /// Restart the whole server. Always picks up a new graph topology but
    /// briefly silences all audio.
    FullRestart,
}

/// The order strategies are tried in.
pub const STRATEGY_LADDER: [Strategy; 3] = [
    Strategy::SignalReload,
    Strategy::ScopedRestart,
    Strategy::FullRestart,
];

/// Result of one strategy attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReloadOutcome {
    /// The server came back ready.
    Success,
    /// This strategy failed; the next one may still work.
    TryNext,
    /// Nothing further to try.
    Terminal,
}

impl Strategy {
    /// Short name for logs and reports.
    pub fn name(self) -> &'static str {
        match self {
            Strategy::SignalReload => "signal-reload",
            Strategy::ScopedRestart => "scoped-restart",
            Strategy::FullRestart => "full-restart",
        }
    }

    /// Whether the equalizer node is expected to keep its id.
    pub fn preserves_node_identity(self) -> bool {
        matches!(self, Strategy::SignalReload)
    }

    /// How long to wait for readiness after this strategy's action.
    pub fn ready_timeout(self, settings: &ReloadSettings) -> Duration {
        match self {
            Strategy::SignalReload => settings.signal_ready_timeout(),
            Strategy::ScopedRestart => settings.compat_ready_timeout(),
            Strategy::FullRestart => settings.full_ready_timeout(),
        }
    }

    fn failed(self) -> ReloadOutcome {
        match self {
            Strategy::FullRestart => ReloadOutcome::Terminal,
            _ => ReloadOutcome::TryNext,
        }
    }

    /// Carry out the strategy's action, then wait for the server to be ready.
    pub(crate) fn attempt(
        self,
        server: &dyn AudioServer,
        settings: &ReloadSettings,
    ) -> ReloadOutcome {
        let acted = match self {
            Strategy::SignalReload => {
                let pids = server.server_pids();
                if pids.is_empty() {
                    tracing::warn!("no {} process to signal", crate::probe::SERVER_NAME);
                    false
                } else {
                    let delivered = pids
                        .iter()
                        .filter(|&&pid| server.send_reload_signal(pid))
                        .count();
                    tracing::debug!(?pids, delivered, "reload signal sent");
                    delivered > 0
                }
            }
            Strategy::ScopedRestart => server.restart_compat_service(),
            Strategy::FullRestart => server.restart_server(),
        };

        if !acted {
            tracing::warn!(strategy = self.name(), "action could not be carried out");
            return self.failed();
        }

        let timeout = self.ready_timeout(settings);
        if server.wait_until_ready(timeout) {
            ReloadOutcome::Success
        } else {
            tracing::warn!(strategy = self.name(), ?timeout, "server not ready in time");
            self.failed()
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
