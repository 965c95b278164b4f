//! `lapse run`: actuator assembly, telemetry reader, and the ingestion loop.

use crossbeam_channel as xch;
use eyre::WrapErr;
use lapse_bridge::{ProcessBridge, SimulatedCamera};
use lapse_core::atomic::write_status;
use lapse_core::mocks::NullActuator;
use lapse_core::runner::{RunReport, run};
use lapse_core::{Event, LinkEvent, Scheduler, StatusSnapshot};
use lapse_traits::Actuator;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::link::{LinkMonitor, SharedActuator};

/// Options for one run, resolved from CLI flags.
#[derive(Debug, Clone)]
pub struct RunOpts {
    pub telemetry: String,
    pub pace: Option<Duration>,
    pub dry_run: bool,
}

/// The chosen actuator, the link state to announce first, and the bridge
/// handle the link monitor watches (real helper processes only).
struct Assembled {
    actuator: Box<dyn Actuator + Send>,
    link: LinkEvent,
    bridge: Option<Arc<Mutex<ProcessBridge>>>,
}

fn assemble_actuator(cfg: &lapse_config::Config, dry_run: bool) -> eyre::Result<Assembled> {
    if dry_run {
        tracing::info!("dry run: triggers are evaluated but never fired");
        return Ok(Assembled {
            actuator: Box::new(NullActuator),
            link: LinkEvent::Disconnected,
            bridge: None,
        });
    }
    let Some(program) = cfg.bridge.command.as_deref() else {
        tracing::info!("no [bridge] command configured; using simulated camera");
        return Ok(Assembled {
            actuator: Box::new(SimulatedCamera::new()),
            link: LinkEvent::Connected,
            bridge: None,
        });
    };

    let timeout = Duration::from_millis(cfg.bridge.command_timeout_ms);
    let mut bridge = ProcessBridge::spawn(program, &cfg.bridge.args, timeout)
        .wrap_err_with(|| format!("start capture helper `{program}`"))?;
    let link = match bridge.connect() {
        Ok(()) => LinkEvent::Connected,
        Err(e) => {
            tracing::warn!(error = %e, "camera connect failed; captures stay disabled until it recovers");
            LinkEvent::Disconnected
        }
    };
    let shared = Arc::new(Mutex::new(bridge));
    Ok(Assembled {
        actuator: Box::new(SharedActuator(shared.clone())),
        link,
        bridge: Some(shared),
    })
}

/// Parse one telemetry line. Blank lines are skipped silently.
fn parse_line(line: &str, lineno: usize) -> Option<Event> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(v) if v.is_object() => Some(Event::Telemetry(v)),
        Ok(_) => {
            tracing::warn!(line = lineno, "telemetry line is not a JSON object; skipped");
            None
        }
        Err(e) => {
            tracing::warn!(line = lineno, error = %e, "malformed telemetry line; skipped");
            None
        }
    }
}

/// Feed `reader` into `tx` on a dedicated thread. At EOF the link monitor is
/// stopped and the sender dropped, which ends the run.
fn spawn_reader(
    reader: Box<dyn BufRead + Send>,
    tx: xch::Sender<Event>,
    pace: Option<Duration>,
    shutdown: Arc<AtomicBool>,
    monitor: Option<LinkMonitor>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        for (i, line) in reader.lines().enumerate() {
            if shutdown.load(std::sync::atomic::Ordering::Relaxed) {
                break;
            }
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    tracing::error!(error = %e, "telemetry read failed");
                    break;
                }
            };
            if let Some(ev) = parse_line(&line, i + 1) {
                if tx.send(ev).is_err() {
                    break;
                }
                if let Some(p) = pace {
                    std::thread::sleep(p);
                }
            }
        }
        drop(monitor);
        tracing::debug!("telemetry reader finished");
    })
}

fn open_source(source: &str) -> eyre::Result<Box<dyn BufRead + Send>> {
    if source == "-" {
        return Ok(Box::new(BufReader::new(std::io::stdin())));
    }
    let f = std::fs::File::open(source).wrap_err_with(|| format!("open telemetry {source}"))?;
    Ok(Box::new(BufReader::new(f)))
}

/// Run the pipeline until the telemetry ends or Ctrl-C, then return the
/// final status.
pub fn run_telemetry(
    cfg: &lapse_config::Config,
    opts: &RunOpts,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<(StatusSnapshot, RunReport)> {
    let source = open_source(&opts.telemetry)?;
    let assembled = assemble_actuator(cfg, opts.dry_run)?;

    let mut scheduler: Scheduler = Scheduler::builder()
        .with_actuator(assembled.actuator)
        .with_config(cfg)
        .build()
        .wrap_err("build scheduler")?;

    let (tx, rx) = xch::bounded::<Event>(64);
    // Capacity is 64 and nothing else has sent yet.
    let _ = tx.try_send(Event::Link(assembled.link));
    let monitor = match assembled.bridge {
        Some(bridge) => Some(
            LinkMonitor::spawn(
                bridge,
                matches!(assembled.link, LinkEvent::Connected),
                tx.clone(),
                Duration::from_millis(cfg.bridge.link_check_ms),
                shutdown.clone(),
            )
            .wrap_err("start link monitor")?,
        ),
        None => None,
    };
    let reader = spawn_reader(source, tx, opts.pace, shutdown.clone(), monitor);

    let status_file = cfg.status.file.as_ref().map(PathBuf::from);
    let report = run(&mut scheduler, &rx, &shutdown, |s, out| {
        if let Some((from, to)) = out.promoted {
            tracing::debug!(%from, %to, "promotion observed by runner");
        }
        if let Some(path) = &status_file {
            if let Err(e) = write_status(path, &s.status()) {
                let err = lapse_core::LapseError::Io(e.to_string());
                tracing::warn!(path = %path.display(), error = %err, "status write failed");
            }
        }
    });

    // The reader may be blocked on stdin after Ctrl-C; don't wait for it then.
    if matches!(report.end, lapse_core::runner::RunEnd::Drained) {
        let _ = reader.join();
    }

    let status = scheduler.status();
    if let Some(path) = &status_file {
        write_status(path, &status).wrap_err_with(|| format!("write status {}", path.display()))?;
    }
    Ok((status, report))
}

/// Human-readable end-of-run summary.
pub fn render_summary(status: &StatusSnapshot, report: &RunReport) -> String {
    let c = status.counters;
    let mut out = format!(
        "events: {}\nstate: {}\nlayer: {}/{}\nlast triggered layer: {}\ntriggers: {} scheduled, {} succeeded, {} failed, {} skipped\n",
        report.events,
        status.accepted_state,
        status.current_layer,
        status
            .total_layers
            .map_or_else(|| "?".to_string(), |t| t.to_string()),
        status
            .last_triggered_layer
            .map_or_else(|| "-".to_string(), |l| l.to_string()),
        c.scheduled,
        c.succeeded,
        c.failed,
        c.skipped,
    );
    if let Some(o) = &status.last_trigger_outcome {
        out.push_str(&format!("last outcome: {o}\n"));
    }
    out
}
