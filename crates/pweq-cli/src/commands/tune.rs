//! Interactive tuning: one edit per stdin line, debounced reloads.
//!
//! ```text
//! 1000=3.5   set a band
//! 63+        nudge up one step
//! 8000-      nudge down one step
//! reset      all bands flat
//! show       print current gains
//! quit       apply what is pending and exit
//! ```
//!
//! Ctrl-C drops the pending edit and exits; a reload already running
//! finishes first.

use std::io::BufRead;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, select, unbounded};
use pweq_config::{GAIN_STEP, GainTable};
use pweq_pipewire::{ApplyReport, ReloadScheduler};

use super::common::{Context, parse_band, parse_band_gain, print_gains};

/// How often the exit path re-checks for a pending edit.
const DRAIN_TICK: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq)]
enum Edit {
    Set(u32, f32),
    Nudge(u32, f32),
    Reset,
    Show,
    Quit,
}

impl Edit {
    /// `Ok(None)` for blank lines and `#` comments.
    fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let edit = match line {
            "reset" => Edit::Reset,
            "show" => Edit::Show,
            "quit" | "exit" => Edit::Quit,
            _ if line.contains('=') => {
                let (freq, gain) = parse_band_gain(line)?;
                Edit::Set(freq, gain)
            }
            _ => {
                if let Some(freq) = line.strip_suffix('+') {
                    Edit::Nudge(parse_band(freq)?, GAIN_STEP)
                } else if let Some(freq) = line.strip_suffix('-') {
                    Edit::Nudge(parse_band(freq)?, -GAIN_STEP)
                } else {
                    return Err(format!(
                        "Unrecognised edit '{}' (expected FREQ=GAIN, FREQ+, FREQ-, reset, show or quit)",
                        line
                    ));
                }
            }
        };
        Ok(Some(edit))
    }

    /// Apply to `gains`. Returns whether the table changed.
    fn apply_to(self, gains: &mut GainTable) -> anyhow::Result<bool> {
        match self {
            Edit::Set(freq, gain) => {
                let stored = gains.set(freq, gain)?;
                println!("{} Hz -> {:+.1} dB", freq, stored);
                Ok(true)
            }
            Edit::Nudge(freq, delta) => {
                let stored = gains.set(freq, gains.gain_or_flat(freq) + delta)?;
                println!("{} Hz -> {:+.1} dB", freq, stored);
                Ok(true)
            }
            Edit::Reset => {
                *gains = GainTable::flat();
                println!("all bands -> flat");
                Ok(true)
            }
            Edit::Show => {
                print_gains(gains);
                Ok(false)
            }
            Edit::Quit => Ok(false),
        }
    }
}

fn print_report(report: &ApplyReport) {
    if report.is_success() {
        println!("{}", report.message());
    } else {
        eprintln!("reload failed: {}", report.message());
    }
}

pub fn run(ctx: &Context) -> anyhow::Result<()> {
    let mut gains = ctx.session().load()?;
    let session = ctx.session();

    let scheduler = ReloadScheduler::spawn(
        ctx.orchestrator(),
        ctx.settings.debounce(),
        ctx.settings.debounce_max(),
    )?;
    let reports = scheduler.reports().clone();

    let (line_tx, line_rx) = unbounded::<String>();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    let (interrupt_tx, interrupt_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.try_send(());
    })?;

    println!("Tuning. Enter FREQ=GAIN, FREQ+, FREQ-, reset, show or quit.");

    let on_report = |report: ApplyReport| {
        print_report(&report);
        if report.is_success() {
            if let Err(e) = session.save(&report.gains) {
                tracing::warn!("could not save session: {e}");
            }
        }
    };

    let mut interrupted = false;
    loop {
        select! {
            recv(line_rx) -> line => {
                let Ok(line) = line else { break };
                match Edit::parse(&line) {
                    Ok(Some(Edit::Quit)) => break,
                    Ok(Some(edit)) => {
                        if edit.apply_to(&mut gains)? {
                            scheduler.submit(gains.clone());
                        }
                    }
                    Ok(None) => {}
                    Err(e) => eprintln!("{}", e),
                }
            }
            recv(reports) -> report => {
                if let Ok(report) = report {
                    on_report(report);
                }
            }
            recv(interrupt_rx) -> _ => {
                interrupted = true;
                break;
            }
        }
    }

    if interrupted {
        if scheduler.cancel_pending() {
            println!("\nPending edit discarded.");
        }
    } else {
        // Let the last edit get past the debounce before stopping the worker.
        while scheduler.has_pending() {
            select! {
                recv(reports) -> report => {
                    if let Ok(report) = report {
                        on_report(report);
                    }
                }
                recv(interrupt_rx) -> _ => {
                    scheduler.cancel_pending();
                    break;
                }
                default(DRAIN_TICK) => {}
            }
        }
    }

    scheduler.shutdown();
    for report in reports.try_iter() {
        on_report(report);
    }
    Ok(())
}
