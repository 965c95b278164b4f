//! Collaborator seams for the layer-capture pipeline.
//!
//! The core never talks to a camera or reads wall time directly; it goes
//! through `Actuator` and `Clock` so both can be replaced in tests.

pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Error type used at the collaborator boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Busy/ready flags reported by the capture device. Any field may be unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActuatorStatus {
    pub busy: Option<bool>,
    pub encoding: Option<bool>,
    pub ready: Option<bool>,
}

impl ActuatorStatus {
    /// True when any known flag says the device cannot take a command now.
    /// Unknown flags never count as busy.
    pub fn is_busy(&self) -> bool {
        self.busy == Some(true) || self.encoding == Some(true) || self.ready == Some(false)
    }
}

/// Camera actuator bridge. Every call may be slow or fail.
pub trait Actuator {
    /// Whether the link to the device is up.
    fn is_ready(&mut self) -> bool;
    fn query_status(&mut self) -> Result<ActuatorStatus, BoxError>;
    /// Fire the shutter once.
    fn capture(&mut self) -> Result<(), BoxError>;
    /// Best-effort forced reset after exhausted retries.
    fn recover(&mut self) -> Result<(), BoxError>;
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn is_ready(&mut self) -> bool {
        (**self).is_ready()
    }
    fn query_status(&mut self) -> Result<ActuatorStatus, BoxError> {
        (**self).query_status()
    }
    fn capture(&mut self) -> Result<(), BoxError> {
        (**self).capture()
    }
    fn recover(&mut self) -> Result<(), BoxError> {
        (**self).recover()
    }
}

#[cfg(test)]
mod tests {
    use super::ActuatorStatus;

    #[test]
    fn unknown_flags_are_not_busy() {
        assert!(!ActuatorStatus::default().is_busy());
    }

    #[test]
    fn any_known_blocking_flag_is_busy() {
        let busy = ActuatorStatus {
            busy: Some(true),
            ..ActuatorStatus::default()
        };
        let encoding = ActuatorStatus {
            encoding: Some(true),
            ..ActuatorStatus::default()
        };
        let not_ready = ActuatorStatus {
            ready: Some(false),
            ..ActuatorStatus::default()
        };
        assert!(busy.is_busy());
        assert!(encoding.is_busy());
        assert!(not_ready.is_busy());
    }
}
