//! Debounced, single-flight reload scheduling.
//!
//! Interactive edits arrive faster than a reload cycle completes. The
//! scheduler keeps exactly one pending [`GainTable`] (the latest) and one
//! worker thread that owns the [`ReloadOrchestrator`]:
//!
//! ```text
//! submit(g) ─► slot = Some(g) ─► Wake::Edit ─┐
//!                                            ▼
//!        worker: wait for `debounce` of quiet ─► slot.take() ─► apply ─► reports()
//! ```
//!
//! Each edit restarts the quiet period, but never past `max_wait` from the
//! first edit of the burst, so a steady stream of edits still reloads.
//!
//! At most one cycle runs at a time. Edits made while a cycle runs overwrite
//! the slot and are applied by the next cycle.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::Mutex;
use pweq_config::GainTable;

use crate::orchestrator::{ApplyReport, ReloadOrchestrator};
use crate::probe::AudioServer;

enum Wake {
    Edit,
    Shutdown,
}

/// Owns a worker thread that applies the most recent submitted table.
pub struct ReloadScheduler {
    slot: Arc<Mutex<Option<GainTable>>>,
    wake: Sender<Wake>,
    reports: Receiver<ApplyReport>,
    worker: Option<JoinHandle<()>>,
}

impl ReloadScheduler {
    /// Start the worker thread.
    ///
    /// A burst of edits is applied after `debounce` of quiet, or `max_wait`
    /// after its first edit, whichever comes first.
    pub fn spawn<S>(
        orchestrator: ReloadOrchestrator<S>,
        debounce: Duration,
        max_wait: Duration,
    ) -> std::io::Result<Self>
    where
        S: AudioServer + 'static,
    {
        let slot: Arc<Mutex<Option<GainTable>>> = Arc::new(Mutex::new(None));
        let (wake_tx, wake_rx) = unbounded();
        let (report_tx, report_rx) = unbounded();

        let worker_slot = Arc::clone(&slot);
        let worker = thread::Builder::new()
            .name("pweq-reload".into())
            .spawn(move || {
                run_worker(
                    &orchestrator,
                    &worker_slot,
                    &wake_rx,
                    &report_tx,
                    debounce,
                    max_wait.max(debounce),
                );
            })?;

        Ok(Self {
            slot,
            wake: wake_tx,
            reports: report_rx,
            worker: Some(worker),
        })
    }

    /// Replace the pending table with `gains`. Returns `true` if an earlier
    /// pending table was superseded.
    pub fn submit(&self, gains: GainTable) -> bool {
        let superseded = self.slot.lock().replace(gains).is_some();
        if superseded {
            tracing::debug!("pending edit superseded");
        }
        let _ = self.wake.send(Wake::Edit);
        superseded
    }

    /// Drop the pending table, if any. A cycle already running is not affected.
    pub fn cancel_pending(&self) -> bool {
        let cancelled = self.slot.lock().take().is_some();
        if cancelled {
            tracing::info!("pending edit cancelled");
        }
        cancelled
    }

    /// Whether a table is waiting to be applied.
    pub fn has_pending(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Completed cycles, in order.
    pub fn reports(&self) -> &Receiver<ApplyReport> {
        &self.reports
    }

    /// Stop the worker after the cycle in progress, discarding anything
    /// still pending.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.wake.send(Wake::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("reload worker panicked");
            }
        }
    }
}

impl Drop for ReloadScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for ReloadScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadScheduler")
            .field("pending", &self.has_pending())
            .field("running", &self.worker.is_some())
            .finish_non_exhaustive()
    }
}

fn run_worker<S: AudioServer>(
    orchestrator: &ReloadOrchestrator<S>,
    slot: &Mutex<Option<GainTable>>,
    wake: &Receiver<Wake>,
    reports: &Sender<ApplyReport>,
    debounce: Duration,
    max_wait: Duration,
) {
    loop {
        match wake.recv() {
            Ok(Wake::Edit) => {}
            Ok(Wake::Shutdown) | Err(_) => return,
        }

        // Quiet period: every further edit restarts it, up to the deadline.
        let deadline = Instant::now() + max_wait;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::debug!(?max_wait, "edits kept coming, applying anyway");
                break;
            }
            match wake.recv_timeout(debounce.min(remaining)) {
                Ok(Wake::Edit) => {}
                Ok(Wake::Shutdown) | Err(RecvTimeoutError::Disconnected) => return,
                Err(RecvTimeoutError::Timeout) => break,
            }
        }

        let Some(gains) = slot.lock().take() else {
            // Cancelled, or already applied by an earlier cycle.
            continue;
        };

        let report = orchestrator.apply(gains);
        if reports.send(report).is_err() {
            return;
        }
    }
}
