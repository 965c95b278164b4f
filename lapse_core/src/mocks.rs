//! Actuator stand-ins for dry runs, benches and tests.

use lapse_traits::{Actuator, ActuatorStatus, BoxError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Never ready; captures are refused. Used for `--dry-run`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullActuator;

impl Actuator for NullActuator {
    fn is_ready(&mut self) -> bool {
        false
    }

    fn query_status(&mut self) -> Result<ActuatorStatus, BoxError> {
        Ok(ActuatorStatus::default())
    }

    fn capture(&mut self) -> Result<(), BoxError> {
        Err(Box::new(std::io::Error::other("null actuator")))
    }

    fn recover(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Script {
    not_ready: bool,
    always_busy: bool,
    capture_failures_left: u32,
    recover_error: Option<String>,
    captures: Vec<Instant>,
    queries: u32,
    recovers: u32,
}

/// Shared view of what a `ScriptedActuator` was asked to do.
#[derive(Debug, Clone, Default)]
pub struct ActuatorCalls(Arc<Mutex<Script>>);

impl ActuatorCalls {
    fn lock(&self) -> MutexGuard<'_, Script> {
        self.0.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn captures(&self) -> usize {
        self.lock().captures.len()
    }

    /// Instants at which `capture` was called, in order.
    pub fn capture_times(&self) -> Vec<Instant> {
        self.lock().captures.clone()
    }

    pub fn queries(&self) -> u32 {
        self.lock().queries
    }

    pub fn recovers(&self) -> u32 {
        self.lock().recovers
    }

    /// Flip readiness at runtime (e.g. to simulate a dropped link).
    pub fn set_ready(&self, ready: bool) {
        self.lock().not_ready = !ready;
    }

    pub fn set_busy(&self, busy: bool) {
        self.lock().always_busy = busy;
    }
}

/// Programmable actuator that records every call.
#[derive(Debug, Clone, Default)]
pub struct ScriptedActuator {
    calls: ActuatorCalls,
}

impl ScriptedActuator {
    /// Ready, idle, and every capture succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// The first `n` captures fail.
    pub fn failing_captures(self, n: u32) -> Self {
        self.calls.lock().capture_failures_left = n;
        self
    }

    /// Status always reports busy.
    pub fn always_busy(self) -> Self {
        self.calls.set_busy(true);
        self
    }

    pub fn not_ready(self) -> Self {
        self.calls.set_ready(false);
        self
    }

    pub fn failing_recover(self, msg: &str) -> Self {
        self.calls.lock().recover_error = Some(msg.to_string());
        self
    }

    pub fn calls(&self) -> ActuatorCalls {
        self.calls.clone()
    }
}

impl Actuator for ScriptedActuator {
    fn is_ready(&mut self) -> bool {
        !self.calls.lock().not_ready
    }

    fn query_status(&mut self) -> Result<ActuatorStatus, BoxError> {
        let mut s = self.calls.lock();
        s.queries += 1;
        Ok(ActuatorStatus {
            busy: Some(s.always_busy),
            encoding: Some(false),
            ready: Some(true),
        })
    }

    fn capture(&mut self) -> Result<(), BoxError> {
        let mut s = self.calls.lock();
        s.captures.push(Instant::now());
        if s.capture_failures_left > 0 {
            s.capture_failures_left -= 1;
            return Err(Box::new(std::io::Error::other("shutter rejected")));
        }
        Ok(())
    }

    fn recover(&mut self) -> Result<(), BoxError> {
        let mut s = self.calls.lock();
        s.recovers += 1;
        match &s.recover_error {
            Some(msg) => Err(Box::new(std::io::Error::other(msg.clone()))),
            None => Ok(()),
        }
    }
}
