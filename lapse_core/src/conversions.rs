//! `From` implementations bridging `lapse_config` types to `lapse_core` types.

use crate::config::{ClassifierCfg, DebounceCfg, StatusCfg, TriggerCfg};
use std::time::Duration;

// ── DebounceCfg ──────────────────────────────────────────────────────────────

impl From<&lapse_config::DebounceCfg> for DebounceCfg {
    fn from(c: &lapse_config::DebounceCfg) -> Self {
        Self {
            dwell: Duration::from_millis(c.dwell_ms),
        }
    }
}

// ── TriggerCfg ───────────────────────────────────────────────────────────────

impl From<&lapse_config::TriggerCfg> for TriggerCfg {
    fn from(c: &lapse_config::TriggerCfg) -> Self {
        Self {
            settle: Duration::from_millis(c.settle_ms),
            max_attempts: c.max_attempts.max(1),
            retry_backoff: Duration::from_millis(c.retry_backoff_ms),
            busy_wait: Duration::from_millis(c.busy_wait_ms),
        }
    }
}

// ── ClassifierCfg ────────────────────────────────────────────────────────────

impl From<&lapse_config::ClassifierCfg> for ClassifierCfg {
    fn from(c: &lapse_config::ClassifierCfg) -> Self {
        Self {
            heating_nozzle_c: c.heating_nozzle_c,
            heating_bed_c: c.heating_bed_c,
            finish_tokens: c.finish_tokens.clone(),
            idle_tokens: c.idle_tokens.clone(),
        }
    }
}

// ── StatusCfg ────────────────────────────────────────────────────────────────

impl From<&lapse_config::StatusCfg> for StatusCfg {
    fn from(c: &lapse_config::StatusCfg) -> Self {
        Self {
            log_capacity: c.log_capacity.max(1),
        }
    }
}
