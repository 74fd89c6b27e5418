//! Queries and actions against the running audio server.
//!
//! [`AudioServer`] is the seam between the reload logic and PipeWire. The
//! production implementation, [`PipeWireServer`], shells out through a
//! [`CommandRunner`]; every query is bounded and collapses failure, timeout
//! and "no match" into an absence value. Nothing here caches server state:
//! each call asks again, because other processes and the user can change it
//! at any time.

use std::thread;
use std::time::{Duration, Instant};

use pweq_config::{EQ_INPUT_NODE_NAME, ReloadSettings};

use crate::command::{CommandError, CommandRunner, SystemRunner};
use crate::objects::{find_node_id, find_port_id, parse_objects};

/// Service unit and process name of the audio server.
pub const SERVER_NAME: &str = "pipewire";

/// Service unit of the PulseAudio compatibility layer.
pub const COMPAT_SERVICE: &str = "pipewire-pulse";

/// ALSA backend module loaded on first setup.
pub const ALSA_MODULE: &str = "module-alsa-sink";

/// Everything the reload logic needs to know about or do to the audio server.
///
/// Query methods return absence (`false`, `None`, empty) rather than errors;
/// action methods report whether the action was carried out, not whether the
/// server picked it up. Callers verify with [`wait_until_ready`](Self::wait_until_ready).
pub trait AudioServer: Send {
    /// Whether the server's service reports itself active.
    fn is_server_running(&self) -> bool;

    /// Whether an ALSA backend module is loaded.
    fn is_alsa_module_loaded(&self) -> bool;

    /// Id of the equalizer's virtual sink node, if present.
    fn find_equalizer_node_id(&self) -> Option<u32>;

    /// Id of an input port on `node_id`, if present.
    fn find_filter_port_id(&self, node_id: u32) -> Option<u32>;

    /// Whether the server answers a basic introspection query right now.
    fn is_ready(&self) -> bool;

    /// Poll readiness until it succeeds or `timeout` elapses.
    fn wait_until_ready(&self, timeout: Duration) -> bool;

    /// Process ids of the main server process.
    fn server_pids(&self) -> Vec<u32>;

    /// Ask process `pid` to re-read its configuration.
    fn send_reload_signal(&self, pid: u32) -> bool;

    /// Restart only the compatibility service.
    fn restart_compat_service(&self) -> bool;

    /// Restart the whole server.
    fn restart_server(&self) -> bool;

    /// Load the ALSA backend module.
    fn load_alsa_module(&self) -> bool;
}

/// Call `check` every `interval` until it returns `true` or `timeout` elapses.
///
/// `check` receives the time remaining so it can bound its own work.
pub fn poll_until(
    timeout: Duration,
    interval: Duration,
    mut check: impl FnMut(Duration) -> bool,
) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return false;
        }
        if check(remaining) {
            return true;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return false;
        }
        thread::sleep(interval.min(remaining));
    }
}

/// [`AudioServer`] for a PipeWire session managed by the user's systemd.
#[derive(Debug, Clone)]
pub struct PipeWireServer<R: CommandRunner = SystemRunner> {
    runner: R,
    settings: ReloadSettings,
}

impl PipeWireServer<SystemRunner> {
    /// Server driven through real processes.
    pub fn system(settings: ReloadSettings) -> Self {
        Self::new(SystemRunner, settings)
    }
}

impl<R: CommandRunner> PipeWireServer<R> {
    /// Server driven through `runner`.
    pub fn new(runner: R, settings: ReloadSettings) -> Self {
        Self { runner, settings }
    }

    /// Settings in use.
    pub fn settings(&self) -> &ReloadSettings {
        &self.settings
    }

    /// Run a command and return its stdout if it exited successfully.
    fn query_within(&self, program: &str, args: &[&str], timeout: Duration) -> Option<String> {
        match self.runner.run(program, args, timeout) {
            Ok(out) if out.success => Some(out.stdout),
            Ok(out) => {
                tracing::debug!(program, ?args, code = ?out.code, "query exited unsuccessfully");
                None
            }
            Err(e @ CommandError::Timeout { .. }) => {
                tracing::warn!(?args, "{e}");
                None
            }
            Err(e) => {
                tracing::debug!(?args, "{e}");
                None
            }
        }
    }

    fn query(&self, program: &str, args: &[&str]) -> Option<String> {
        self.query_within(program, args, self.settings.probe_timeout())
    }

    /// Run an action command; `true` if it exited successfully.
    fn action_within(&self, program: &str, args: &[&str], timeout: Duration) -> bool {
        match self.runner.run(program, args, timeout) {
            Ok(out) if out.success => true,
            Ok(out) => {
                tracing::warn!(program, ?args, code = ?out.code, "action failed");
                false
            }
            Err(e) => {
                tracing::warn!(?args, "{e}");
                false
            }
        }
    }

    fn ready_within(&self, timeout: Duration) -> bool {
        self.runner
            .run("pw-cli", &["info", "0"], timeout)
            .is_ok_and(|out| out.success)
    }
}

impl<R: CommandRunner> AudioServer for PipeWireServer<R> {
    fn is_server_running(&self) -> bool {
        self.query("systemctl", &["--user", "is-active", SERVER_NAME])
            .is_some_and(|out| out.trim() == "active")
    }

    fn is_alsa_module_loaded(&self) -> bool {
        self.query("pactl", &["list", "short", "modules"])
            .is_some_and(|out| {
                out.lines().any(|line| {
                    line.split_whitespace()
                        .nth(1)
                        .is_some_and(|name| name.starts_with("module-alsa"))
                })
            })
    }

    fn find_equalizer_node_id(&self) -> Option<u32> {
        let out = self.query("pw-cli", &["list-objects", "Node"])?;
        find_node_id(&parse_objects(&out), EQ_INPUT_NODE_NAME)
    }

    fn find_filter_port_id(&self, node_id: u32) -> Option<u32> {
        let out = self.query("pw-cli", &["list-objects", "Port"])?;
        find_port_id(&parse_objects(&out), node_id)
    }

    fn is_ready(&self) -> bool {
        self.ready_within(self.settings.probe_timeout())
    }

    fn wait_until_ready(&self, timeout: Duration) -> bool {
        let probe_timeout = self.settings.probe_timeout();
        let started = Instant::now();
        let ready = poll_until(timeout, self.settings.poll_interval(), |remaining| {
            self.ready_within(remaining.min(probe_timeout))
        });
        tracing::debug!(
            ready,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "readiness wait finished"
        );
        ready
    }

    fn server_pids(&self) -> Vec<u32> {
        self.query("pgrep", &["-x", SERVER_NAME])
            .map(|out| {
                out.lines()
                    .filter_map(|line| line.trim().parse().ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn send_reload_signal(&self, pid: u32) -> bool {
        let pid = pid.to_string();
        self.action_within("kill", &["-HUP", &pid], self.settings.probe_timeout())
    }

    fn restart_compat_service(&self) -> bool {
        self.action_within(
            "systemctl",
            &["--user", "restart", COMPAT_SERVICE],
            self.settings.action_timeout(),
        )
    }

    fn restart_server(&self) -> bool {
        self.action_within(
            "systemctl",
            &["--user", "restart", SERVER_NAME],
            self.settings.action_timeout(),
        )
    }

    fn load_alsa_module(&self) -> bool {
        self.action_within(
            "pactl",
            &["load-module", ALSA_MODULE],
            self.settings.probe_timeout(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandOutput;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Replies keyed by the full command line; unknown commands fail to spawn.
    #[derive(Default)]
    struct ScriptedRunner {
        replies: HashMap<String, CommandOutput>,
        timeouts: Vec<String>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedRunner {
        fn reply(mut self, cmdline: &str, out: CommandOutput) -> Self {
            self.replies.insert(cmdline.to_string(), out);
            self
        }

        fn time_out(mut self, cmdline: &str) -> Self {
            self.timeouts.push(cmdline.to_string());
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(
            &self,
            program: &str,
            args: &[&str],
            timeout: Duration,
        ) -> Result<CommandOutput, CommandError> {
            let cmdline = std::iter::once(program)
                .chain(args.iter().copied())
                .collect::<Vec<_>>()
                .join(" ");
            self.calls.lock().push(cmdline.clone());
            if self.timeouts.contains(&cmdline) {
                return Err(CommandError::Timeout {
                    program: program.to_string(),
                    timeout,
                });
            }
            self.replies
                .get(&cmdline)
                .cloned()
                .ok_or_else(|| CommandError::Spawn {
                    program: program.to_string(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                })
        }
    }

    fn fast_settings() -> ReloadSettings {
        ReloadSettings {
            poll_interval_ms: 5,
            ..ReloadSettings::default()
        }
    }

    fn server(runner: ScriptedRunner) -> PipeWireServer<ScriptedRunner> {
        PipeWireServer::new(runner, fast_settings())
    }

    #[test]
    fn running_when_active() {
        let s = server(ScriptedRunner::default().reply(
            "systemctl --user is-active pipewire",
            CommandOutput::ok("active\n"),
        ));
        assert!(s.is_server_running());
    }

    #[test]
    fn not_running_when_inactive_or_missing() {
        let s = server(ScriptedRunner::default().reply(
            "systemctl --user is-active pipewire",
            CommandOutput::failed(3),
        ));
        assert!(!s.is_server_running());
        assert!(!server(ScriptedRunner::default()).is_server_running());
    }

    #[test]
    fn timeout_is_absence() {
        let s = server(ScriptedRunner::default().time_out("pw-cli list-objects Node"));
        assert_eq!(s.find_equalizer_node_id(), None);
    }

    #[test]
    fn alsa_module_detection() {
        let listing = "536870912\tmodule-always-sink\t\t\n536870913\tmodule-alsa-card\tdevice_id=0\t\n";
        let s = server(
            ScriptedRunner::default()
                .reply("pactl list short modules", CommandOutput::ok(listing)),
        );
        assert!(s.is_alsa_module_loaded());

        let s = server(ScriptedRunner::default().reply(
            "pactl list short modules",
            CommandOutput::ok("1\tmodule-null-sink\t\n"),
        ));
        assert!(!s.is_alsa_module_loaded());
    }

    #[test]
    fn equalizer_node_and_port_lookup() {
        let nodes = "\tid 31, type PipeWire:Interface:Node/3\n\t\tnode.name = \"effect_input.pweq\"\n";
        let ports = "\tid 41, type PipeWire:Interface:Port/3\n\t\tnode.id = \"31\"\n\t\tport.direction = \"in\"\n";
        let s = server(
            ScriptedRunner::default()
                .reply("pw-cli list-objects Node", CommandOutput::ok(nodes))
                .reply("pw-cli list-objects Port", CommandOutput::ok(ports)),
        );
        assert_eq!(s.find_equalizer_node_id(), Some(31));
        assert_eq!(s.find_filter_port_id(31), Some(41));
        assert_eq!(s.find_filter_port_id(32), None);
    }

    #[test]
    fn pids_parsed_per_line() {
        let s = server(
            ScriptedRunner::default().reply("pgrep -x pipewire", CommandOutput::ok("1200\n1300\n")),
        );
        assert_eq!(s.server_pids(), vec![1200, 1300]);
        assert!(server(ScriptedRunner::default()).server_pids().is_empty());
    }

    #[test]
    fn signal_targets_pid() {
        let runner = ScriptedRunner::default().reply("kill -HUP 1200", CommandOutput::ok(""));
        let s = server(runner);
        assert!(s.send_reload_signal(1200));
        assert!(!s.send_reload_signal(1300));
    }

    #[test]
    fn restarts_use_user_units() {
        let s = server(
            ScriptedRunner::default()
                .reply("systemctl --user restart pipewire-pulse", CommandOutput::ok(""))
                .reply("systemctl --user restart pipewire", CommandOutput::failed(1)),
        );
        assert!(s.restart_compat_service());
        assert!(!s.restart_server());
    }

    #[test]
    fn wait_until_ready_polls_until_timeout() {
        let s = server(ScriptedRunner::default());
        let started = Instant::now();
        assert!(!s.wait_until_ready(Duration::from_millis(60)));
        assert!(started.elapsed() >= Duration::from_millis(60));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(s.runner.calls().len() > 1, "should poll more than once");
    }

    #[test]
    fn wait_until_ready_returns_on_first_success() {
        let s = server(
            ScriptedRunner::default().reply("pw-cli info 0", CommandOutput::ok("id: 0\n")),
        );
        assert!(s.wait_until_ready(Duration::from_secs(5)));
        assert_eq!(s.runner.calls(), vec!["pw-cli info 0".to_string()]);
    }

    #[test]
    fn poll_until_stops_at_first_true() {
        let mut n = 0;
        assert!(poll_until(Duration::from_secs(5), Duration::from_millis(1), |_| {
            n += 1;
            n == 3
        }));
        assert_eq!(n, 3);
    }
}
