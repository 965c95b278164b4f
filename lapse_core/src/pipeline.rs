//! The `Scheduler` aggregate: one ingestion path feeding normalizer,
//! classifier, debouncer and layer-edge detector in order, with the trigger
//! scheduler hanging off the end.
//!
//! Everything here runs on the caller's thread. Only the trigger worker runs
//! elsewhere, and it never writes back into debounce or layer state.

use lapse_traits::clock::Clock;
use serde_json::Value;
use std::sync::Arc;

use crate::config::ClassifierCfg;
use crate::debounce::{DebounceContext, Debounced};
use crate::event::{Event, LinkEvent};
use crate::layer::{LayerEdge, LayerProgress};
use crate::scheduler::{ScheduledTrigger, TriggerScheduler};
use crate::snapshot::{Normalizer, PrinterSnapshot};
use crate::state::{PrintState, classify};
use crate::status::{StatusBoard, StatusSnapshot};

/// What one ingested event changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ingested {
    /// Accepted state after the event.
    pub accepted: PrintState,
    /// Set when this event promoted a new accepted state.
    pub promoted: Option<(PrintState, PrintState)>,
    pub edge: Option<LayerEdge>,
    pub scheduled: Option<ScheduledTrigger>,
}

pub struct Scheduler {
    pub(crate) normalizer: Normalizer,
    pub(crate) classifier: ClassifierCfg,
    pub(crate) debounce: DebounceContext,
    pub(crate) layers: LayerProgress,
    pub(crate) trigger: TriggerScheduler,
    pub(crate) board: StatusBoard,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) actuator_ready: bool,
}

impl core::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Scheduler")
            .field("accepted", &self.debounce.accepted())
            .field("candidate", &self.debounce.candidate())
            .field("layer", &self.layers.current_layer())
            .field("last_triggered", &self.layers.last_triggered())
            .field("actuator_ready", &self.actuator_ready)
            .finish()
    }
}

impl Scheduler {
    /// Start building a Scheduler.
    pub fn builder() -> crate::builder::SchedulerBuilder {
        crate::builder::SchedulerBuilder::default()
    }

    /// Process one event. Never fails and never blocks on the actuator.
    pub fn ingest(&mut self, event: Event) -> Ingested {
        match event {
            Event::Telemetry(raw) => self.on_telemetry(&raw),
            Event::Link(link) => {
                self.on_link(link);
                Ingested {
                    accepted: self.debounce.accepted(),
                    promoted: None,
                    edge: None,
                    scheduled: None,
                }
            }
        }
    }

    pub fn on_telemetry(&mut self, raw: &Value) -> Ingested {
        let now = self.clock.now();
        let snapshot = self.normalizer.normalize(raw);

        if self.normalizer.job_started() {
            tracing::info!(job = ?snapshot.job_id, hint = %snapshot.raw_state_hint, "new job");
            self.board.info(format!(
                "new job {}",
                snapshot.job_id.as_deref().unwrap_or("?")
            ));
            self.layers.reset_job();
        }

        let candidate = classify(&snapshot, self.debounce.accepted(), &self.classifier);
        let step = self.debounce.update(candidate, now);
        let promoted = match step {
            Debounced::Promoted { from, to } => {
                tracing::info!(from = %from, to = %to, "state accepted");
                self.board.info(format!("state {from} -> {to}"));
                if to.ends_job() {
                    self.layers.reset_job();
                    self.normalizer.reset_job();
                }
                Some((from, to))
            }
            Debounced::Held(_) => None,
        };
        let accepted = step.accepted();

        let edge = self.layers.on_accepted_state(accepted, &snapshot);
        let scheduled = edge.and_then(|e| self.offer_edge(e, &snapshot, now));

        Ingested {
            accepted,
            promoted,
            edge,
            scheduled,
        }
    }

    fn offer_edge(
        &mut self,
        edge: LayerEdge,
        snapshot: &PrinterSnapshot,
        now: std::time::Instant,
    ) -> Option<ScheduledTrigger> {
        tracing::debug!(layer = edge.layer, total = ?snapshot.total_layers, "layer edge");
        match self
            .trigger
            .schedule(edge, now, self.actuator_ready, snapshot.timelapse_armed)
        {
            Ok(t) => {
                self.layers.record_triggered(edge.layer);
                Some(t)
            }
            Err(reason) => {
                tracing::debug!(layer = edge.layer, ?reason, "edge not scheduled");
                None
            }
        }
    }

    pub fn on_link(&mut self, link: LinkEvent) {
        let ready = matches!(link, LinkEvent::Connected);
        if ready == self.actuator_ready {
            return;
        }
        self.actuator_ready = ready;
        if ready {
            tracing::info!("actuator connected");
            self.board.info("actuator connected");
        } else {
            tracing::warn!("actuator disconnected");
            self.board.warn("actuator disconnected");
        }
    }

    pub fn accepted_state(&self) -> PrintState {
        self.debounce.accepted()
    }

    pub fn last_snapshot(&self) -> &PrinterSnapshot {
        self.normalizer.last()
    }

    pub fn layers(&self) -> &LayerProgress {
        &self.layers
    }

    pub fn board(&self) -> &StatusBoard {
        &self.board
    }

    pub fn trigger_pending(&self) -> bool {
        self.trigger.is_pending()
    }

    /// Point-in-time view for the dashboard.
    pub fn status(&self) -> StatusSnapshot {
        let snap = self.normalizer.last();
        StatusSnapshot {
            accepted_state: self.debounce.accepted(),
            candidate_state: self.debounce.candidate(),
            current_layer: self.layers.current_layer(),
            total_layers: snap.total_layers,
            last_triggered_layer: self.layers.last_triggered(),
            trigger_pending: self.trigger.is_pending(),
            actuator_ready: self.actuator_ready,
            timelapse_armed: snap.timelapse_armed,
            last_trigger_outcome: self.board.last_outcome(),
            counters: self.board.counters(),
            log: self.board.log_lines(),
        }
    }

    /// Cancel any pending trigger and join the worker.
    pub fn shutdown(&mut self) {
        self.trigger.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DebounceCfg, TriggerCfg};
    use crate::mocks::ScriptedActuator;
    use lapse_traits::clock::test_clock::TestClock;
    use serde_json::json;
    use std::time::Duration;

    fn build(clock: &TestClock, ready: bool) -> Scheduler {
        Scheduler::builder()
            .with_actuator(ScriptedActuator::new())
            .with_clock(Arc::new(clock.clone()))
            .with_debounce(DebounceCfg {
                dwell: Duration::from_secs(5),
            })
            .with_trigger(TriggerCfg {
                settle: Duration::from_millis(1),
                ..TriggerCfg::default()
            })
            .with_actuator_ready(ready)
            .build()
            .expect("build")
    }

    #[test]
    fn promotion_waits_for_dwell() {
        let clock = TestClock::new();
        let mut s = build(&clock, true);
        let msg = json!({"layer": 3, "total": 10, "armed": true});
        let first = s.on_telemetry(&msg);
        assert_eq!(first.accepted, PrintState::Unknown);
        assert_eq!(first.edge, None);
        clock.advance(Duration::from_secs(4));
        assert_eq!(s.on_telemetry(&msg).accepted, PrintState::Unknown);
        clock.advance(Duration::from_secs(1));
        let third = s.on_telemetry(&msg);
        assert_eq!(
            third.promoted,
            Some((PrintState::Unknown, PrintState::Printing))
        );
        assert_eq!(third.edge, Some(LayerEdge { layer: 3 }));
        assert!(third.scheduled.is_some());
        assert_eq!(s.layers().last_triggered(), Some(3));
    }

    #[test]
    fn link_events_gate_scheduling() {
        let clock = TestClock::new();
        let mut s = build(&clock, false);
        let msg = json!({"layer": 1, "total": 10, "armed": true});
        s.on_telemetry(&msg);
        clock.advance(Duration::from_secs(5));
        let out = s.on_telemetry(&msg);
        assert_eq!(out.edge, Some(LayerEdge { layer: 1 }));
        assert_eq!(out.scheduled, None);
        assert_eq!(s.layers().last_triggered(), None);

        s.ingest(Event::Link(LinkEvent::Connected));
        assert!(s.status().actuator_ready);
        let out = s.on_telemetry(&json!({"layer": 2}));
        assert!(out.scheduled.is_some());
    }

    #[test]
    fn finishing_clears_layer_history() {
        let clock = TestClock::new();
        let mut s = build(&clock, true);
        let msg = json!({"layer": 1, "total": 10, "armed": true, "state": "RUNNING"});
        s.on_telemetry(&msg);
        clock.advance(Duration::from_secs(5));
        assert!(s.on_telemetry(&msg).edge.is_some());
        assert!(s.layers().already_seen(1));

        let done = json!({"state": "FINISH"});
        s.on_telemetry(&done);
        clock.advance(Duration::from_secs(5));
        let out = s.on_telemetry(&done);
        assert_eq!(out.accepted, PrintState::Finished);
        assert!(!s.layers().already_seen(1));
        assert_eq!(s.layers().last_triggered(), None);
    }

    #[test]
    fn preparing_next_job_does_not_reuse_last_layer() {
        let clock = TestClock::new();
        let mut s = build(&clock, true);
        let run = json!({"layer_num": 100, "total_layer_num": 100, "gcode_state": "RUNNING", "timelapse": true});
        s.on_telemetry(&run);
        let done = json!({"gcode_state": "FINISH"});
        s.on_telemetry(&done);
        clock.advance(Duration::from_secs(5));
        assert_eq!(s.on_telemetry(&done).accepted, PrintState::Finished);
        assert_eq!(s.last_snapshot().current_layer, None);

        let prep = json!({"layer_num": 0, "total_layer_num": 250, "gcode_state": "PREPARE", "nozzle_temper": 200});
        let out = s.on_telemetry(&prep);
        assert!(s.board().log_lines().iter().any(|l| l.message.starts_with("new job")));
        assert_eq!(out.edge, None);
        clock.advance(Duration::from_secs(5));
        let out = s.on_telemetry(&prep);
        assert_eq!(out.accepted, PrintState::Heating);
        assert_eq!(out.edge, None);
        assert_eq!(s.layers().last_triggered(), None);
    }

    #[test]
    fn status_reflects_pipeline() {
        let clock = TestClock::new();
        let mut s = build(&clock, true);
        s.on_telemetry(&json!({"print": {"layer_num": 2, "total_layer_num": 50, "nozzle_temper": 210.0}}));
        let st = s.status();
        assert_eq!(st.accepted_state, PrintState::Unknown);
        assert_eq!(st.candidate_state, Some(PrintState::Printing));
        assert_eq!(st.current_layer, 2);
        assert_eq!(st.total_layers, Some(50));
        assert!(!st.trigger_pending);
        s.shutdown();
    }
}
