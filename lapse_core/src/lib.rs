#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Printer-state debouncing and layer-synchronized photo triggering
//! (hardware-agnostic).
//!
//! The camera is reached only through `lapse_traits::Actuator`, and time
//! only through `lapse_traits::Clock`.
//!
//! ## Architecture
//!
//! - **Normalizer**: vendor telemetry → `PrinterSnapshot`, carrying absent
//!   fields forward (`snapshot` module)
//! - **Classifier**: priority-ordered rules → `PrintState` (`state`)
//! - **Debouncer**: dwell-time hysteresis on state changes (`debounce`)
//! - **Layer edges**: at-most-once per layer per job (`layer`)
//! - **Trigger scheduler**: settle delay, single pending slot, worker thread
//!   (`scheduler`)
//! - **Executor**: bounded retries, busy probe, one recovery (`executor`)
//! - **Status**: rolling log and outcome counters (`status`)
//!
//! Ingestion is synchronous and ordered (`pipeline::Scheduler::ingest`).
//! Only the trigger worker runs on another thread.

pub mod actuator_error;
pub mod atomic;
pub mod builder;
pub mod cancel;
pub mod config;
pub mod conversions;
pub mod debounce;
pub mod error;
pub mod event;
pub mod executor;
pub mod layer;
pub mod mocks;
pub mod pipeline;
pub mod runner;
pub mod scheduler;
pub mod snapshot;
pub mod state;
pub mod status;

pub use builder::SchedulerBuilder;
pub use config::{ClassifierCfg, DebounceCfg, StatusCfg, TriggerCfg};
pub use error::{ActuatorFault, BuildError, LapseError, Report, Result, TriggerFailure};
pub use event::{Event, LinkEvent};
pub use executor::{CommandExecutor, TriggerOutcome};
pub use layer::LayerEdge;
pub use pipeline::{Ingested, Scheduler};
pub use scheduler::{Declined, ScheduledTrigger, TriggerScheduler};
pub use snapshot::{Normalizer, PrinterSnapshot};
pub use state::PrintState;
pub use status::{LogEntry, LogLevel, StatusBoard, StatusSnapshot, TriggerCounters};
