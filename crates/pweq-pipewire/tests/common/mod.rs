//! Scriptable in-memory audio server shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pweq_config::ReloadSettings;
use pweq_pipewire::AudioServer;

/// What the fake server does in response to each action.
#[derive(Debug, Clone)]
pub struct Script {
    pub pids: Vec<u32>,
    pub signal_delivered: bool,
    pub compat_restart_ok: bool,
    pub full_restart_ok: bool,
    /// Readiness after each action: signal, compat restart, full restart.
    pub ready_after: [bool; 3],
    /// Node id before any action.
    pub node_id: Option<u32>,
    /// Whether the reload signal recreates the node under a new id.
    pub signal_recreates_node: bool,
    pub alsa_loaded: bool,
    pub alsa_load_ok: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            pids: vec![1234],
            signal_delivered: true,
            compat_restart_ok: true,
            full_restart_ok: true,
            ready_after: [true, true, true],
            node_id: Some(42),
            signal_recreates_node: false,
            alsa_loaded: true,
            alsa_load_ok: true,
        }
    }
}

#[derive(Debug)]
struct State {
    script: Script,
    node_id: Option<u32>,
    ready: bool,
    log: Vec<String>,
}

/// Cloneable handle; clones share state so a test can inspect the log after
/// handing one clone to the orchestrator.
#[derive(Debug, Clone)]
pub struct FakeServer {
    state: Arc<Mutex<State>>,
}

impl FakeServer {
    pub fn new(script: Script) -> Self {
        let node_id = script.node_id;
        Self {
            state: Arc::new(Mutex::new(State {
                script,
                node_id,
                ready: true,
                log: Vec::new(),
            })),
        }
    }

    /// Actions carried out, in order.
    pub fn log(&self) -> Vec<String> {
        self.state.lock().log.clone()
    }

    pub fn count(&self, action: &str) -> usize {
        self.state.lock().log.iter().filter(|a| *a == action).count()
    }

    pub fn script(&self, f: impl FnOnce(&mut Script)) {
        f(&mut self.state.lock().script);
    }

    fn record(&self, action: impl Into<String>) {
        self.state.lock().log.push(action.into());
    }
}

impl AudioServer for FakeServer {
    fn is_server_running(&self) -> bool {
        true
    }

    fn is_alsa_module_loaded(&self) -> bool {
        self.state.lock().script.alsa_loaded
    }

    fn find_equalizer_node_id(&self) -> Option<u32> {
        self.state.lock().node_id
    }

    fn find_filter_port_id(&self, node_id: u32) -> Option<u32> {
        Some(node_id + 1)
    }

    fn is_ready(&self) -> bool {
        self.state.lock().ready
    }

    fn wait_until_ready(&self, _timeout: Duration) -> bool {
        self.record("wait");
        self.state.lock().ready
    }

    fn server_pids(&self) -> Vec<u32> {
        self.state.lock().script.pids.clone()
    }

    fn send_reload_signal(&self, pid: u32) -> bool {
        self.record(format!("signal {pid}"));
        let mut state = self.state.lock();
        if !state.script.signal_delivered {
            return false;
        }
        state.ready = state.script.ready_after[0];
        if state.script.signal_recreates_node {
            state.node_id = state.node_id.map(|id| id + 100);
        }
        true
    }

    fn restart_compat_service(&self) -> bool {
        self.record("restart compat");
        let mut state = self.state.lock();
        if !state.script.compat_restart_ok {
            return false;
        }
        state.ready = state.script.ready_after[1];
        true
    }

    fn restart_server(&self) -> bool {
        self.record("restart server");
        let mut state = self.state.lock();
        if !state.script.full_restart_ok {
            return false;
        }
        state.ready = state.script.ready_after[2];
        state.node_id = state.node_id.map(|id| id + 1000);
        true
    }

    fn load_alsa_module(&self) -> bool {
        self.record("load alsa");
        let mut state = self.state.lock();
        if state.script.alsa_load_ok {
            state.script.alsa_loaded = true;
        }
        state.script.alsa_load_ok
    }
}

/// Settings that keep any real waiting short.
pub fn fast_settings() -> ReloadSettings {
    ReloadSettings {
        probe_timeout_ms: 50,
        action_timeout_ms: 50,
        signal_ready_timeout_ms: 50,
        compat_ready_timeout_ms: 50,
        full_ready_timeout_ms: 50,
        poll_interval_ms: 5,
        debounce_ms: 20,
        debounce_max_ms: 200,
    }
}
