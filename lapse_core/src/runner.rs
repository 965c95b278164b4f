//! Ingestion loop: drain events in arrival order until the stream ends or
//! shutdown is requested, then stop the trigger worker.

use crossbeam_channel as xch;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::event::Event;
use crate::pipeline::{Ingested, Scheduler};

/// How often the shutdown flag is checked while the stream is idle.
const POLL: Duration = Duration::from_millis(50);

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// Every sender was dropped (end of telemetry).
    Drained,
    /// The shutdown flag was set.
    Interrupted,
}

/// Summary of one `run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub end: RunEnd,
    pub events: u64,
}

/// Process `events` one at a time. `on_event` sees the scheduler after each
/// event (status publication hooks in here).
pub fn run<F>(
    scheduler: &mut Scheduler,
    events: &xch::Receiver<Event>,
    shutdown: &AtomicBool,
    mut on_event: F,
) -> RunReport
where
    F: FnMut(&Scheduler, &Ingested),
{
    let mut count = 0u64;
    let end = loop {
        if shutdown.load(Ordering::Relaxed) {
            break RunEnd::Interrupted;
        }
        match events.recv_timeout(POLL) {
            Ok(ev) => {
                let out = scheduler.ingest(ev);
                count += 1;
                on_event(scheduler, &out);
            }
            Err(xch::RecvTimeoutError::Timeout) => continue,
            Err(xch::RecvTimeoutError::Disconnected) => break RunEnd::Drained,
        }
    };
    tracing::info!(events = count, ?end, "ingestion stopped");
    scheduler.shutdown();
    RunReport { end, events: count }
}
