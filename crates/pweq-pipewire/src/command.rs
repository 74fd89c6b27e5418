//! Bounded external command execution.
//!
//! Every interaction with the audio server goes through an external tool
//! (`systemctl`, `pw-cli`, `pactl`, `pgrep`, `kill`). [`CommandRunner`] is the
//! seam for that: [`SystemRunner`] spawns real processes, tests substitute a
//! scripted runner.
//!
//! A run never outlives its timeout. Stdout is drained on a helper thread so a
//! chatty child cannot stall on a full pipe while the caller polls for exit;
//! on timeout the child is killed and reaped.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// How often a running child is polled for exit.
const EXIT_POLL: Duration = Duration::from_millis(10);

/// Grace period for collecting stdout after the child exited.
const STDOUT_GRACE: Duration = Duration::from_millis(250);

/// Result of a command that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the command exited with status 0.
    pub success: bool,
    /// Exit code, if the command exited normally.
    pub code: Option<i32>,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
}

impl CommandOutput {
    /// Successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
        }
    }

    /// Failed output with exit code `code` and empty stdout.
    pub fn failed(code: i32) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
        }
    }
}

/// Reasons a command produced no output.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The program could not be started (not installed, not executable).
    #[error("failed to start '{program}': {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The program did not exit within its bound and was killed.
    #[error("'{program}' did not finish within {timeout:?}")]
    Timeout {
        /// Program that timed out.
        program: String,
        /// The bound that was exceeded.
        timeout: Duration,
    },

    /// Waiting for the program failed.
    #[error("failed waiting for '{program}': {source}")]
    Wait {
        /// Program being waited on.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Kill `child` and wait for it so no zombie is left behind.
fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Runs an external program with a hard time bound.
pub trait CommandRunner: Send {
    /// Run `program` with `args`, giving up after `timeout`.
    fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError>;
}

/// [`CommandRunner`] backed by [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        let started = Instant::now();
        let deadline = started + timeout;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| CommandError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let (tx, rx) = crossbeam_channel::bounded::<Vec<u8>>(1);
        if let Some(mut stdout) = child.stdout.take() {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = stdout.read_to_end(&mut buf);
                let _ = tx.send(buf);
            });
        }

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    let now = Instant::now();
                    if now >= deadline {
                        kill_and_reap(&mut child);
                        tracing::debug!(program, ?timeout, "command timed out, killed");
                        return Err(CommandError::Timeout {
                            program: program.to_string(),
                            timeout,
                        });
                    }
                    thread::sleep(EXIT_POLL.min(deadline - now));
                }
                Err(source) => {
                    kill_and_reap(&mut child);
                    return Err(CommandError::Wait {
                        program: program.to_string(),
                        source,
                    });
                }
            }
        };

        // A grandchild may still hold the pipe open; don't wait on it forever.
        let stdout = rx.recv_timeout(STDOUT_GRACE).unwrap_or_default();

        tracing::trace!(
            program,
            ?args,
            code = ?status.code(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "command finished"
        );

        Ok(CommandOutput {
            success: status.success(),
            code: status.code(),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
        })
    }
}
