//! Builder for the `Scheduler` aggregate.
//!
//! Everything but the actuator has a default. Runtime configs are validated
//! on `build()` so a hand-assembled pipeline gets the same checks as one
//! loaded from TOML.

use std::sync::Arc;

use lapse_traits::Actuator;
use lapse_traits::clock::{Clock, MonotonicClock};

use crate::config::{ClassifierCfg, DebounceCfg, StatusCfg, TriggerCfg};
use crate::debounce::DebounceContext;
use crate::error::{BuildError, Result};
use crate::layer::LayerProgress;
use crate::pipeline::Scheduler;
use crate::scheduler::TriggerScheduler;
use crate::snapshot::Normalizer;
use crate::status::StatusBoard;

#[derive(Default)]
pub struct SchedulerBuilder {
    actuator: Option<Box<dyn Actuator + Send>>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    debounce: Option<DebounceCfg>,
    trigger: Option<TriggerCfg>,
    classifier: Option<ClassifierCfg>,
    status: Option<StatusCfg>,
    actuator_ready: bool,
}

impl core::fmt::Debug for SchedulerBuilder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SchedulerBuilder")
            .field("has_actuator", &self.actuator.is_some())
            .field("debounce", &self.debounce)
            .field("trigger", &self.trigger)
            .field("actuator_ready", &self.actuator_ready)
            .finish()
    }
}

impl SchedulerBuilder {
    pub fn with_actuator(mut self, actuator: impl Actuator + Send + 'static) -> Self {
        self.actuator = Some(Box::new(actuator));
        self
    }

    /// Inject a clock (tests use `TestClock`). Defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_debounce(mut self, cfg: DebounceCfg) -> Self {
        self.debounce = Some(cfg);
        self
    }

    pub fn with_trigger(mut self, cfg: TriggerCfg) -> Self {
        self.trigger = Some(cfg);
        self
    }

    pub fn with_classifier(mut self, cfg: ClassifierCfg) -> Self {
        self.classifier = Some(cfg);
        self
    }

    pub fn with_status(mut self, cfg: StatusCfg) -> Self {
        self.status = Some(cfg);
        self
    }

    /// Actuator link state before the first `LinkEvent`. Defaults to false.
    pub fn with_actuator_ready(mut self, ready: bool) -> Self {
        self.actuator_ready = ready;
        self
    }

    /// Apply every section of a loaded config file.
    pub fn with_config(self, cfg: &lapse_config::Config) -> Self {
        self.with_debounce(DebounceCfg::from(&cfg.debounce))
            .with_trigger(TriggerCfg::from(&cfg.trigger))
            .with_classifier(ClassifierCfg::from(&cfg.classifier))
            .with_status(StatusCfg::from(&cfg.status))
            .with_actuator_ready(cfg.actuator.assume_ready)
    }

    /// Validate, spawn the trigger worker, and return the pipeline.
    pub fn build(self) -> Result<Scheduler> {
        let actuator = self
            .actuator
            .ok_or_else(|| eyre::Report::new(BuildError::MissingActuator))?;
        let debounce = self.debounce.unwrap_or_default();
        let trigger = self.trigger.unwrap_or_default();
        let classifier = self.classifier.unwrap_or_default();
        let status = self.status.unwrap_or_default();
        validate(&trigger, &classifier, &status)?;

        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(c) => c,
            None => Arc::new(MonotonicClock::new()),
        };
        let board = StatusBoard::new(status.log_capacity, clock.clone());
        let worker = TriggerScheduler::spawn(actuator, trigger, clock.clone(), board.clone());

        tracing::debug!(
            dwell = ?debounce.dwell,
            ready = self.actuator_ready,
            "scheduler built"
        );

        Ok(Scheduler {
            normalizer: Normalizer::new(),
            classifier,
            debounce: DebounceContext::new(debounce.dwell),
            layers: LayerProgress::new(),
            trigger: worker,
            board,
            clock,
            actuator_ready: self.actuator_ready,
        })
    }
}

fn validate(trigger: &TriggerCfg, classifier: &ClassifierCfg, status: &StatusCfg) -> Result<()> {
    if trigger.max_attempts == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "max_attempts must be >= 1",
        )));
    }
    if !classifier.heating_nozzle_c.is_finite() || !classifier.heating_bed_c.is_finite() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "heating thresholds must be finite",
        )));
    }
    if classifier.finish_tokens.is_empty() || classifier.idle_tokens.is_empty() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "state token lists must not be empty",
        )));
    }
    if status.log_capacity == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "log_capacity must be >= 1",
        )));
    }
    Ok(())
}
