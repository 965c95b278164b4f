use thiserror::Error;

/// Runtime conditions surfaced by the core. None of these stop ingestion.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LapseError {
    #[error("trigger failed: {0}")]
    Trigger(TriggerFailure),
    #[error("io error: {0}")]
    Io(String),
}

/// Typed view of an error returned by an `Actuator` call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActuatorFault {
    #[error("actuator timed out")]
    Timeout,
    #[error("actuator disconnected")]
    Disconnected,
    #[error("actuator rejected command: {0}")]
    Rejected(String),
    #[error("actuator error: {0}")]
    Other(String),
}

/// Why a single capture attempt (or the whole trigger) did not succeed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TriggerFailure {
    #[error("actuator not ready")]
    NotReady,
    #[error("actuator busy")]
    Busy,
    #[error("capture failed: {0}")]
    Capture(ActuatorFault),
    #[error("cancelled by shutdown")]
    Cancelled,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing actuator")]
    MissingActuator,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
