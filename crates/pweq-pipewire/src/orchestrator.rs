//! The reload cycle: render, then walk the strategy ladder until the server
//! comes back ready.
//!
//! ```text
//! Rendering ─► AttemptingStrategy(0) ─► AttemptingStrategy(1) ─► AttemptingStrategy(2)
//!     │                 │                        │                        │
//!     ▼                 ▼                        ▼                        ▼
//! Done(failed)     Verifying ──────────────► Done(ok)               Done(failed)
//! ```
//!
//! A cycle runs to completion once started; signals and restarts cannot be
//! taken back. Failures are reported in the [`ApplyReport`], never raised.

use std::path::{Path, PathBuf};

use pweq_config::{GainTable, ReloadSettings, RenderError, ensure_dir, write_config};
use serde::Serialize;

use crate::probe::AudioServer;
use crate::strategy::{ReloadOutcome, STRATEGY_LADDER, Strategy};

/// Why a reload cycle failed.
#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    /// The config could not be written; no strategy was attempted.
    #[error("failed to write filter-chain config: {0}")]
    Render(#[from] RenderError),

    /// Every strategy was tried and the server never became ready.
    #[error("audio server not ready after {attempts} reload strategies")]
    Exhausted {
        /// Number of strategies attempted.
        attempts: usize,
    },
}

/// What happened to the equalizer node across the reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum NodeIdentity {
    /// Same node id before and after: applications kept their routing.
    Preserved {
        /// The unchanged node id.
        node_id: u32,
    },
    /// The node was recreated. Still working, but applications routed to the
    /// old node need to reselect the output.
    Recreated {
        /// Node id before the reload.
        before: u32,
        /// Node id after the reload.
        after: u32,
    },
    /// The node was missing before or after, so no comparison was possible.
    Unknown,
    /// The winning strategy recreates the node by design; not compared.
    NotChecked,
}

/// Details of a successful reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Applied {
    /// Strategy that brought the server back.
    pub strategy: Strategy,
    /// Node identity comparison.
    pub identity: NodeIdentity,
    /// Equalizer node id after the reload, if found.
    pub node_id: Option<u32>,
    /// Equalizer input port id after the reload, if found.
    pub filter_port_id: Option<u32>,
}

/// Result of one [`ReloadOrchestrator::apply`] call.
#[derive(Debug)]
pub struct ApplyReport {
    /// The table that was rendered.
    pub gains: GainTable,
    /// Strategies attempted, in order.
    pub attempts: Vec<Strategy>,
    /// Success details or the terminal error.
    pub result: Result<Applied, ReloadError>,
}

impl ApplyReport {
    /// Whether the cycle succeeded.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Strategy that succeeded, if any.
    pub fn strategy(&self) -> Option<Strategy> {
        self.result.as_ref().ok().map(|a| a.strategy)
    }

    /// Node identity outcome, if the cycle succeeded.
    pub fn identity(&self) -> Option<NodeIdentity> {
        self.result.as_ref().ok().map(|a| a.identity)
    }

    /// One-line human-readable summary.
    pub fn message(&self) -> String {
        match &self.result {
            Ok(applied) => {
                let identity = match applied.identity {
                    NodeIdentity::Preserved { node_id } => {
                        format!(", node {node_id} preserved")
                    }
                    NodeIdentity::Recreated { before, after } => format!(
                        ", node recreated ({before} -> {after}); reselect the output device in running applications"
                    ),
                    NodeIdentity::Unknown | NodeIdentity::NotChecked => String::new(),
                };
                format!("equalizer applied via {}{identity}", applied.strategy)
            }
            Err(e) => e.to_string(),
        }
    }
}

/// Phase of a reload cycle, reported to an optional observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Writing the config file.
    Rendering,
    /// Trying the strategy at this index of [`STRATEGY_LADDER`].
    AttemptingStrategy(usize),
    /// Checking node identity after a successful strategy.
    Verifying,
    /// Cycle finished.
    Done {
        /// Whether the cycle succeeded.
        success: bool,
    },
}

type PhaseObserver = Box<dyn Fn(Phase) + Send>;

/// Drives one audio server through render + reload cycles.
///
/// Holds no server state between cycles; every [`apply`](Self::apply)
/// queries afresh.
pub struct ReloadOrchestrator<S: AudioServer> {
    server: S,
    config_path: PathBuf,
    settings: ReloadSettings,
    observer: Option<PhaseObserver>,
}

impl<S: AudioServer> ReloadOrchestrator<S> {
    /// Orchestrator writing its config to `config_path`.
    pub fn new(server: S, config_path: impl Into<PathBuf>, settings: ReloadSettings) -> Self {
        Self {
            server,
            config_path: config_path.into(),
            settings,
            observer: None,
        }
    }

    /// Report every phase transition to `observer`.
    pub fn with_phase_observer(mut self, observer: impl Fn(Phase) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// The audio server being driven.
    pub fn server(&self) -> &S {
        &self.server
    }

    /// Path of the rendered config.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Settings in use.
    pub fn settings(&self) -> &ReloadSettings {
        &self.settings
    }

    fn enter(&self, phase: Phase) {
        tracing::debug!(?phase, "reload phase");
        if let Some(observer) = &self.observer {
            observer(phase);
        }
    }

    fn render(&self, gains: &GainTable) -> Result<(), RenderError> {
        if let Some(parent) = self.config_path.parent() {
            ensure_dir(parent)?;
        }
        write_config(&self.config_path, gains)
    }

    /// Best effort; a missing module is logged, not fatal.
    fn ensure_alsa_module(&self) {
        if self.server.is_alsa_module_loaded() {
            tracing::debug!("ALSA module already loaded");
        } else if self.server.load_alsa_module() {
            tracing::info!("loaded ALSA module");
        } else {
            tracing::warn!("could not load ALSA module; continuing");
        }
    }

    fn verify(&self, strategy: Strategy, before: Option<u32>) -> Applied {
        let after = self.server.find_equalizer_node_id();

        let identity = if strategy.preserves_node_identity() {
            match (before, after) {
                (Some(before), Some(after)) if before == after => {
                    tracing::info!(node_id = after, "node identity preserved");
                    NodeIdentity::Preserved { node_id: after }
                }
                (Some(before), Some(after)) => {
                    tracing::warn!(
                        before,
                        after,
                        "equalizer node recreated; applications may need to reselect it"
                    );
                    NodeIdentity::Recreated { before, after }
                }
                _ => {
                    tracing::debug!(?before, ?after, "node identity not comparable");
                    NodeIdentity::Unknown
                }
            }
        } else {
            NodeIdentity::NotChecked
        };

        let filter_port_id = after.and_then(|id| self.server.find_filter_port_id(id));
        tracing::debug!(node_id = ?after, port_id = ?filter_port_id, "equalizer node located");

        Applied {
            strategy,
            identity,
            node_id: after,
            filter_port_id,
        }
    }

    /// Render `gains` and reload the audio server.
    ///
    /// Applying the same table twice re-renders identical content and
    /// re-verifies readiness.
    pub fn apply(&self, gains: GainTable) -> ApplyReport {
        let span = tracing::info_span!("apply", bands = gains.len());
        let _guard = span.enter();

        self.enter(Phase::Rendering);
        let first_setup = !self.config_path.exists();
        if let Err(e) = self.render(&gains) {
            tracing::error!("{e}");
            self.enter(Phase::Done { success: false });
            return ApplyReport {
                gains,
                attempts: Vec::new(),
                result: Err(ReloadError::Render(e)),
            };
        }

        if first_setup {
            tracing::info!(path = %self.config_path.display(), "first-time setup");
            self.ensure_alsa_module();
        }

        let before = self.server.find_equalizer_node_id();
        let mut attempts = Vec::with_capacity(STRATEGY_LADDER.len());

        for (k, strategy) in STRATEGY_LADDER.into_iter().enumerate() {
            self.enter(Phase::AttemptingStrategy(k));
            attempts.push(strategy);
            tracing::info!(strategy = strategy.name(), "attempting reload");

            match strategy.attempt(&self.server, &self.settings) {
                ReloadOutcome::Success => {
                    self.enter(Phase::Verifying);
                    let applied = self.verify(strategy, before);
                    self.enter(Phase::Done { success: true });
                    tracing::info!(strategy = strategy.name(), "reload succeeded");
                    return ApplyReport {
                        gains,
                        attempts,
                        result: Ok(applied),
                    };
                }
                ReloadOutcome::TryNext => {}
                ReloadOutcome::Terminal => break,
            }
        }

        let error = ReloadError::Exhausted {
            attempts: attempts.len(),
        };
        tracing::error!("{error}");
        self.enter(Phase::Done { success: false });
        ApplyReport {
            gains,
            attempts,
            result: Err(error),
        }
    }
}

impl<S: AudioServer + std::fmt::Debug> std::fmt::Debug for ReloadOrchestrator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadOrchestrator")
            .field("server", &self.server)
            .field("config_path", &self.config_path)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
