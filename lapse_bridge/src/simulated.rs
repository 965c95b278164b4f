//! In-process camera for runs without a capture helper.

use lapse_traits::{Actuator, ActuatorStatus, BoxError};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::BridgeError;

#[derive(Debug, Default)]
struct SimState {
    connected: bool,
    busy_polls: u32,
    capture_failures: u32,
    photos: u64,
    resets: u64,
}

/// Simulated camera. Clones share state, so a caller can keep one clone to
/// observe what the pipeline did with the other.
#[derive(Debug, Clone)]
pub struct SimulatedCamera {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimulatedCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedCamera {
    /// Connected, idle camera whose captures always succeed.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                connected: true,
                ..SimState::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Report busy for the next `n` status queries.
    pub fn with_busy_polls(self, n: u32) -> Self {
        self.lock().busy_polls = n;
        self
    }

    /// Fail the next `n` captures.
    pub fn with_capture_failures(self, n: u32) -> Self {
        self.lock().capture_failures = n;
        self
    }

    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }

    /// Photos taken so far.
    pub fn photos(&self) -> u64 {
        self.lock().photos
    }

    /// Link resets performed by `recover`.
    pub fn resets(&self) -> u64 {
        self.lock().resets
    }
}

impl Actuator for SimulatedCamera {
    fn is_ready(&mut self) -> bool {
        self.lock().connected
    }

    fn query_status(&mut self) -> Result<ActuatorStatus, BoxError> {
        let mut s = self.lock();
        if !s.connected {
            return Err(Box::new(BridgeError::NotConnected));
        }
        let busy = s.busy_polls > 0;
        s.busy_polls = s.busy_polls.saturating_sub(1);
        Ok(ActuatorStatus {
            busy: Some(busy),
            encoding: Some(false),
            ready: Some(true),
        })
    }

    fn capture(&mut self) -> Result<(), BoxError> {
        let mut s = self.lock();
        if !s.connected {
            return Err(Box::new(BridgeError::NotConnected));
        }
        if s.capture_failures > 0 {
            s.capture_failures -= 1;
            return Err(Box::new(BridgeError::Rejected("Photo failed: BUSY".into())));
        }
        s.photos += 1;
        tracing::info!(photos = s.photos, "photo taken (simulated)");
        Ok(())
    }

    fn recover(&mut self) -> Result<(), BoxError> {
        let mut s = self.lock();
        s.resets += 1;
        s.connected = true;
        s.busy_polls = 0;
        tracing::info!(resets = s.resets, "link reset (simulated)");
        Ok(())
    }
}
