//! Actuator command executor: one scheduled trigger → one capture, with
//! bounded sequential retries and a single best-effort recovery.
//!
//! Runs on the trigger worker thread, never on the ingestion path. Results
//! go to the `StatusBoard` and the log; nothing here touches debounce or
//! layer state.

use lapse_traits::Actuator;

use crate::actuator_error::map_actuator_error;
use crate::cancel::CancelToken;
use crate::config::TriggerCfg;
use crate::error::{ActuatorFault, LapseError, TriggerFailure};
use crate::status::StatusBoard;

/// Phases of a single trigger. Terminal: `Succeeded`, `Failed`, `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptPhase {
    Pending,
    Probing,
    Firing,
    Retrying,
    Exhausted,
    RecoveryAttempted,
    Succeeded,
    Failed,
    Cancelled,
}

/// Terminal result of one scheduled trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Succeeded {
        layer: u32,
        attempts: u32,
    },
    Failed {
        layer: u32,
        attempts: u32,
        reason: TriggerFailure,
        recovery: Result<(), ActuatorFault>,
    },
    Cancelled {
        layer: u32,
        attempts: u32,
    },
}

impl TriggerOutcome {
    pub fn layer(&self) -> u32 {
        match self {
            Self::Succeeded { layer, .. }
            | Self::Failed { layer, .. }
            | Self::Cancelled { layer, .. } => *layer,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// The failure as a core error, if the trigger did not capture.
    pub fn error(&self) -> Option<LapseError> {
        match self {
            Self::Succeeded { .. } => None,
            Self::Failed { reason, .. } => Some(LapseError::Trigger(reason.clone())),
            Self::Cancelled { .. } => Some(LapseError::Trigger(TriggerFailure::Cancelled)),
        }
    }
}

impl core::fmt::Display for TriggerOutcome {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Succeeded { layer, attempts } => {
                write!(f, "layer {layer} captured (attempt {attempts})")
            }
            Self::Failed {
                layer,
                attempts,
                reason,
                recovery,
            } => {
                write!(f, "layer {layer} failed after {attempts} attempts: {reason}; ")?;
                match recovery {
                    Ok(()) => f.write_str("recovery ok"),
                    Err(e) => write!(f, "recovery failed: {e}"),
                }
            }
            Self::Cancelled { layer, .. } => write!(f, "layer {layer} cancelled"),
        }
    }
}

pub struct CommandExecutor<A: Actuator> {
    actuator: A,
    cfg: TriggerCfg,
    board: StatusBoard,
    cancel: CancelToken,
}

impl<A: Actuator> core::fmt::Debug for CommandExecutor<A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommandExecutor")
            .field("max_attempts", &self.cfg.max_attempts)
            .finish()
    }
}

impl<A: Actuator> CommandExecutor<A> {
    pub fn new(actuator: A, cfg: TriggerCfg, board: StatusBoard, cancel: CancelToken) -> Self {
        Self {
            actuator,
            cfg,
            board,
            cancel,
        }
    }

    /// Capture `layer`, retrying up to `max_attempts` times. Publishes the
    /// outcome to the status board before returning it.
    pub fn fire(&mut self, layer: u32) -> TriggerOutcome {
        let outcome = self.run_attempts(layer);
        match &outcome {
            TriggerOutcome::Succeeded { attempts, .. } => {
                tracing::info!(layer, attempts, "capture succeeded");
                self.board.info(outcome.to_string());
            }
            TriggerOutcome::Failed { attempts, .. } => {
                let err = outcome.error().map(|e| e.to_string()).unwrap_or_default();
                tracing::error!(layer, attempts, error = %err, "capture failed");
                self.board.error(outcome.to_string());
            }
            TriggerOutcome::Cancelled { attempts, .. } => {
                tracing::info!(layer, attempts, "capture cancelled by shutdown");
                self.board.warn(outcome.to_string());
            }
        }
        self.board.set_outcome(outcome.is_success(), outcome.to_string());
        outcome
    }

    fn run_attempts(&mut self, layer: u32) -> TriggerOutcome {
        let max = self.cfg.max_attempts.max(1);
        let mut last_failure = TriggerFailure::NotReady;
        trace_phase(layer, 0, AttemptPhase::Pending);

        for attempt in 1..=max {
            if attempt > 1 {
                trace_phase(layer, attempt, AttemptPhase::Retrying);
                if !self.cancel.wait(self.cfg.retry_backoff) {
                    return self.cancelled(layer, attempt - 1);
                }
            } else if self.cancel.is_cancelled() {
                return self.cancelled(layer, 0);
            }

            match self.attempt(layer, attempt) {
                Ok(()) => {
                    trace_phase(layer, attempt, AttemptPhase::Succeeded);
                    return TriggerOutcome::Succeeded {
                        layer,
                        attempts: attempt,
                    };
                }
                Err(TriggerFailure::Cancelled) => return self.cancelled(layer, attempt),
                Err(failure) => {
                    tracing::warn!(layer, attempt, max, reason = %failure, "capture attempt failed");
                    self.board
                        .warn(format!("layer {layer} attempt {attempt}/{max}: {failure}"));
                    last_failure = failure;
                }
            }
        }

        trace_phase(layer, max, AttemptPhase::Exhausted);
        let recovery = self
            .actuator
            .recover()
            .map_err(|e| map_actuator_error(&*e));
        trace_phase(layer, max, AttemptPhase::RecoveryAttempted);
        if let Err(e) = &recovery {
            tracing::warn!(layer, error = %e, "busy recovery failed");
        }
        trace_phase(layer, max, AttemptPhase::Failed);
        TriggerOutcome::Failed {
            layer,
            attempts: max,
            reason: last_failure,
            recovery,
        }
    }

    /// One attempt: readiness check, optional busy probe, then the shutter.
    fn attempt(&mut self, layer: u32, attempt: u32) -> Result<(), TriggerFailure> {
        if !self.actuator.is_ready() {
            return Err(TriggerFailure::NotReady);
        }

        trace_phase(layer, attempt, AttemptPhase::Probing);
        if self.probe_busy() {
            tracing::debug!(layer, attempt, wait = ?self.cfg.busy_wait, "actuator busy; waiting once");
            if !self.cancel.wait(self.cfg.busy_wait) {
                return Err(TriggerFailure::Cancelled);
            }
            if self.probe_busy() {
                return Err(TriggerFailure::Busy);
            }
        }

        trace_phase(layer, attempt, AttemptPhase::Firing);
        self.actuator
            .capture()
            .map_err(|e| TriggerFailure::Capture(map_actuator_error(&*e)))
    }

    /// Query and command are not atomic on the device, so this is a hint.
    /// A failed query counts as "not busy".
    fn probe_busy(&mut self) -> bool {
        match self.actuator.query_status() {
            Ok(status) => status.is_busy(),
            Err(e) => {
                tracing::debug!(error = %e, "status query failed; treating as unknown");
                false
            }
        }
    }

    fn cancelled(&self, layer: u32, attempts: u32) -> TriggerOutcome {
        trace_phase(layer, attempts, AttemptPhase::Cancelled);
        TriggerOutcome::Cancelled { layer, attempts }
    }
}

#[inline]
fn trace_phase(layer: u32, attempt: u32, phase: AttemptPhase) {
    tracing::trace!(layer, attempt, ?phase, "trigger phase");
}
