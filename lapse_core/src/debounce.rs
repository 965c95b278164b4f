//! Stability debouncer: a candidate state must persist for the dwell
//! threshold before it replaces the accepted state.

use crate::state::PrintState;
use std::time::{Duration, Instant};

/// Result of one debouncer update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Debounced {
    /// Accepted state unchanged.
    Held(PrintState),
    /// Candidate persisted long enough and is now accepted.
    Promoted { from: PrintState, to: PrintState },
}

impl Debounced {
    /// The accepted state after the update.
    #[inline]
    pub fn accepted(self) -> PrintState {
        match self {
            Self::Held(s) => s,
            Self::Promoted { to, .. } => to,
        }
    }
}

/// Long-lived debounce context. Mutated only from the ingestion path.
#[derive(Debug, Clone)]
pub struct DebounceContext {
    accepted: PrintState,
    candidate: Option<(PrintState, Instant)>,
    dwell: Duration,
}

impl DebounceContext {
    pub fn new(dwell: Duration) -> Self {
        Self {
            accepted: PrintState::Unknown,
            candidate: None,
            dwell,
        }
    }

    #[inline]
    pub fn accepted(&self) -> PrintState {
        self.accepted
    }

    /// Pending candidate, if one is deliberating.
    #[inline]
    pub fn candidate(&self) -> Option<PrintState> {
        self.candidate.map(|(s, _)| s)
    }

    #[inline]
    pub fn dwell(&self) -> Duration {
        self.dwell
    }

    /// Feed one classified state observed at `now`.
    ///
    /// Reverting to the accepted state cancels any pending promotion, and a
    /// different candidate restarts the dwell timer, so an A→B→A flap inside
    /// the window never promotes B.
    pub fn update(&mut self, candidate: PrintState, now: Instant) -> Debounced {
        if candidate == self.accepted {
            if let Some((dropped, _)) = self.candidate.take() {
                tracing::debug!(
                    accepted = %self.accepted,
                    dropped = %dropped,
                    "candidate reverted before dwell; transition suppressed"
                );
            }
            return Debounced::Held(self.accepted);
        }

        match self.candidate {
            Some((pending, since)) if pending == candidate => {
                if now.saturating_duration_since(since) >= self.dwell {
                    let from = self.accepted;
                    self.accepted = candidate;
                    self.candidate = None;
                    Debounced::Promoted { from, to: candidate }
                } else {
                    Debounced::Held(self.accepted)
                }
            }
            previous => {
                if let Some((replaced, _)) = previous {
                    tracing::debug!(
                        replaced = %replaced,
                        candidate = %candidate,
                        "candidate changed; dwell restarted"
                    );
                }
                self.candidate = Some((candidate, now));
                Debounced::Held(self.accepted)
            }
        }
    }
}
