//! Trigger scheduler: turns a confirmed layer edge into one deferred capture.
//!
//! Owns a single worker thread that performs the settle wait and runs the
//! `CommandExecutor`. At most one trigger is pending at a time; an edge that
//! arrives while the slot is occupied is dropped, not queued.
//!
//! The worker exits when the `TriggerScheduler` is shut down or dropped.

use crossbeam_channel as xch;
use lapse_traits::Actuator;
use lapse_traits::clock::Clock;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::cancel::{CancelHandle, CancelToken, cancel_pair};
use crate::config::TriggerCfg;
use crate::executor::CommandExecutor;
use crate::layer::LayerEdge;
use crate::status::StatusBoard;

/// A trigger waiting for its settle delay to elapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTrigger {
    pub layer: u32,
    pub fire_at: Instant,
}

/// Why `schedule` declined an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Declined {
    Pending { pending_layer: u32 },
    NotReady,
    NotArmed,
    Stopped,
}

type Slot = Arc<Mutex<Option<ScheduledTrigger>>>;

fn lock_slot(slot: &Slot) -> MutexGuard<'_, Option<ScheduledTrigger>> {
    slot.lock().unwrap_or_else(|p| p.into_inner())
}

pub struct TriggerScheduler {
    tx: Option<xch::Sender<ScheduledTrigger>>,
    pending: Slot,
    cfg: TriggerCfg,
    board: StatusBoard,
    cancel: CancelHandle,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl core::fmt::Debug for TriggerScheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TriggerScheduler")
            .field("pending", &*lock_slot(&self.pending))
            .field("running", &self.join_handle.is_some())
            .finish()
    }
}

impl TriggerScheduler {
    /// Spawn the worker thread; it takes ownership of the actuator.
    pub fn spawn<A, C>(actuator: A, cfg: TriggerCfg, clock: C, board: StatusBoard) -> Self
    where
        A: Actuator + Send + 'static,
        C: Clock + Send + Sync + 'static,
    {
        let (tx, rx) = xch::bounded::<ScheduledTrigger>(1);
        let (cancel, token) = cancel_pair();
        let pending: Slot = Arc::new(Mutex::new(None));
        let executor = CommandExecutor::new(actuator, cfg.clone(), board.clone(), token.clone());
        let worker_pending = pending.clone();

        let join_handle = std::thread::Builder::new()
            .name("lapse-trigger".into())
            .spawn(move || worker_loop(executor, rx, token, worker_pending, clock));

        let join_handle = match join_handle {
            Ok(h) => Some(h),
            Err(e) => {
                tracing::error!(error = %e, "failed to spawn trigger worker; captures disabled");
                board.error(format!("trigger worker unavailable: {e}"));
                None
            }
        };

        Self {
            tx: Some(tx),
            pending,
            cfg,
            board,
            cancel,
            join_handle,
        }
    }

    /// True while a trigger is waiting out its settle delay.
    pub fn is_pending(&self) -> bool {
        lock_slot(&self.pending).is_some()
    }

    /// Arm a trigger for `edge`, firing at `now + settle`. Never blocks.
    pub fn schedule(
        &self,
        edge: LayerEdge,
        now: Instant,
        actuator_ready: bool,
        armed: bool,
    ) -> Result<ScheduledTrigger, Declined> {
        let layer = edge.layer;
        if !armed {
            tracing::warn!(layer, "timelapse not armed; trigger skipped");
            self.board
                .warn(format!("layer {layer}: timelapse not armed, trigger skipped"));
            self.board.count_skipped();
            return Err(Declined::NotArmed);
        }
        if !actuator_ready {
            tracing::warn!(layer, "actuator not ready; trigger skipped");
            self.board
                .warn(format!("layer {layer}: actuator not ready, trigger skipped"));
            self.board.count_skipped();
            return Err(Declined::NotReady);
        }
        let Some(tx) = self.tx.as_ref().filter(|_| self.join_handle.is_some()) else {
            return Err(Declined::Stopped);
        };

        let trigger = ScheduledTrigger {
            layer,
            fire_at: now + self.cfg.settle,
        };
        {
            let mut slot = lock_slot(&self.pending);
            if let Some(p) = *slot {
                tracing::warn!(layer, pending_layer = p.layer, "trigger pending; edge dropped");
                self.board.warn(format!(
                    "layer {layer}: trigger for layer {} still pending, edge dropped",
                    p.layer
                ));
                self.board.count_skipped();
                return Err(Declined::Pending {
                    pending_layer: p.layer,
                });
            }
            *slot = Some(trigger);
        }

        if let Err(e) = tx.try_send(trigger) {
            // Slot was empty, so the worker must have drained the channel.
            tracing::error!(layer, error = %e, "trigger channel rejected a scheduled trigger");
            self.board
                .error(format!("layer {layer}: trigger could not be handed to worker"));
            *lock_slot(&self.pending) = None;
            self.board.count_skipped();
            return Err(Declined::Stopped);
        }

        tracing::info!(layer, settle = ?self.cfg.settle, "trigger scheduled");
        self.board.info(format!("layer {layer}: trigger scheduled"));
        self.board.count_scheduled();
        Ok(trigger)
    }

    /// Cancel a pending settle wait, let an in-flight attempt finish, and
    /// join the worker. Idempotent.
    pub fn shutdown(&mut self) {
        self.cancel.cancel();
        self.tx.take();
        if let Some(h) = self.join_handle.take() {
            if h.join().is_err() {
                tracing::error!("trigger worker panicked");
            }
        }
        if let Some(p) = lock_slot(&self.pending).take() {
            tracing::info!(layer = p.layer, "pending trigger cancelled at shutdown");
        }
    }
}

impl Drop for TriggerScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop<A: Actuator, C: Clock>(
    mut executor: CommandExecutor<A>,
    rx: xch::Receiver<ScheduledTrigger>,
    cancel: CancelToken,
    pending: Slot,
    clock: C,
) {
    loop {
        let trigger = xch::select! {
            recv(cancel.receiver()) -> _ => break,
            recv(rx) -> msg => match msg {
                Ok(t) => t,
                Err(_) => break,
            },
        };

        let wait = trigger.fire_at.saturating_duration_since(clock.now());
        if !wait.is_zero() && !cancel.wait(wait) {
            tracing::debug!(layer = trigger.layer, "settle wait cancelled");
            break;
        }

        // The slot covers the settle wait only; an edge arriving during the
        // capture may queue the next trigger.
        lock_slot(&pending).take();
        let _outcome = executor.fire(trigger.layer);
    }
    tracing::trace!("trigger worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::ScriptedActuator;
    use lapse_traits::clock::MonotonicClock;
    use std::time::Duration;

    fn cfg(settle_ms: u64) -> TriggerCfg {
        TriggerCfg {
            settle: Duration::from_millis(settle_ms),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(1),
            busy_wait: Duration::from_millis(1),
        }
    }

    fn wait_until(mut f: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if f() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        false
    }

    fn board() -> StatusBoard {
        StatusBoard::new(64, Arc::new(MonotonicClock::new()))
    }

    #[test]
    fn second_edge_while_pending_is_dropped() {
        let act = ScriptedActuator::new();
        let calls = act.calls();
        let b = board();
        let s = TriggerScheduler::spawn(act, cfg(200), MonotonicClock::new(), b.clone());
        let now = Instant::now();
        assert!(s.schedule(LayerEdge { layer: 1 }, now, true, true).is_ok());
        assert_eq!(
            s.schedule(LayerEdge { layer: 2 }, now, true, true),
            Err(Declined::Pending { pending_layer: 1 })
        );
        assert!(wait_until(|| calls.captures() == 1));
        assert!(wait_until(|| b.counters().succeeded == 1));
        assert_eq!(calls.captures(), 1);
        assert_eq!(b.counters().skipped, 1);
    }

    #[test]
    fn settle_delay_is_honored() {
        let act = ScriptedActuator::new();
        let calls = act.calls();
        let s = TriggerScheduler::spawn(act, cfg(60), MonotonicClock::new(), board());
        let t = s
            .schedule(LayerEdge { layer: 3 }, Instant::now(), true, true)
            .expect("scheduled");
        assert!(wait_until(|| calls.captures() == 1));
        assert!(calls.capture_times()[0] >= t.fire_at);
    }

    #[test]
    fn gates_fail_closed() {
        let act = ScriptedActuator::new();
        let calls = act.calls();
        let b = board();
        let s = TriggerScheduler::spawn(act, cfg(0), MonotonicClock::new(), b.clone());
        let now = Instant::now();
        assert_eq!(
            s.schedule(LayerEdge { layer: 1 }, now, false, true),
            Err(Declined::NotReady)
        );
        assert_eq!(
            s.schedule(LayerEdge { layer: 1 }, now, true, false),
            Err(Declined::NotArmed)
        );
        assert!(!s.is_pending());
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(calls.captures(), 0);
        assert_eq!(b.counters().scheduled, 0);
        assert_eq!(b.counters().skipped, 2);
        let lines = b.log_lines();
        assert!(lines.iter().any(|l| l.message.contains("actuator not ready")));
        assert!(lines
            .iter()
            .any(|l| l.message == "layer 1: timelapse not armed, trigger skipped"));
    }

    #[test]
    fn shutdown_cancels_pending_settle() {
        let act = ScriptedActuator::new();
        let calls = act.calls();
        let mut s = TriggerScheduler::spawn(act, cfg(10_000), MonotonicClock::new(), board());
        s.schedule(LayerEdge { layer: 5 }, Instant::now(), true, true)
            .expect("scheduled");
        let start = Instant::now();
        s.shutdown();
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(calls.captures(), 0);
        assert!(!s.is_pending());
        assert_eq!(
            s.schedule(LayerEdge { layer: 6 }, Instant::now(), true, true),
            Err(Declined::Stopped)
        );
    }
}
