//! Runtime configuration for the pipeline.
//!
//! These are the structs the core works with. They are separate from the
//! TOML-deserialized config in `lapse_config`; see `conversions`.

use std::time::Duration;

/// Stability debouncer settings.
#[derive(Debug, Clone)]
pub struct DebounceCfg {
    /// Minimum time a candidate state must persist before it is accepted.
    pub dwell: Duration,
}

impl Default for DebounceCfg {
    fn default() -> Self {
        Self {
            dwell: Duration::from_millis(5_000),
        }
    }
}

/// Trigger scheduling and execution settings.
#[derive(Debug, Clone)]
pub struct TriggerCfg {
    /// Wait between an accepted layer edge and the capture command.
    pub settle: Duration,
    /// Capture attempts per layer (>= 1).
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub retry_backoff: Duration,
    /// Extra wait before re-querying a busy camera.
    pub busy_wait: Duration,
}

impl Default for TriggerCfg {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(800),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(1_000),
            busy_wait: Duration::from_millis(1_000),
        }
    }
}

/// State classifier thresholds and vendor vocabulary.
#[derive(Debug, Clone)]
pub struct ClassifierCfg {
    pub heating_nozzle_c: f32,
    pub heating_bed_c: f32,
    /// Upper-case vendor tokens meaning the job finished.
    pub finish_tokens: Vec<String>,
    /// Upper-case vendor tokens meaning idle.
    pub idle_tokens: Vec<String>,
}

impl Default for ClassifierCfg {
    fn default() -> Self {
        Self {
            heating_nozzle_c: 150.0,
            heating_bed_c: 60.0,
            finish_tokens: vec!["FINISH".into(), "FINISHED".into(), "COMPLETED".into()],
            idle_tokens: vec!["IDLE".into()],
        }
    }
}

/// Dashboard-facing status settings.
#[derive(Debug, Clone)]
pub struct StatusCfg {
    /// Rolling log capacity in lines.
    pub log_capacity: usize,
}

impl Default for StatusCfg {
    fn default() -> Self {
        Self { log_capacity: 400 }
    }
}
