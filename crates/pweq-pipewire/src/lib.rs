//! Getting a running PipeWire server to pick up a new equalizer config.
//!
//! PipeWire has no "reload this module" call, so applying new gains means
//! rewriting the filter-chain file and then nudging the server with
//! escalating force until it comes back ready:
//!
//! 1. `SIGHUP` to the server process (the equalizer node normally survives)
//! 2. restart the PulseAudio compatibility service
//! 3. restart the whole server
//!
//! [`ReloadOrchestrator`] runs that ladder once per [`apply`](ReloadOrchestrator::apply);
//! [`ReloadScheduler`] debounces bursts of edits onto a worker thread. Server
//! access goes through the [`AudioServer`] trait so the ladder can be driven
//! against a fake in tests.

pub mod command;
pub mod objects;
pub mod orchestrator;
pub mod probe;
pub mod scheduler;
pub mod strategy;

pub use command::{CommandError, CommandOutput, CommandRunner, SystemRunner};
pub use orchestrator::{
    Applied, ApplyReport, NodeIdentity, Phase, ReloadError, ReloadOrchestrator,
};
pub use probe::{AudioServer, PipeWireServer, poll_until};
pub use scheduler::ReloadScheduler;
pub use strategy::{STRATEGY_LADDER, Strategy};
