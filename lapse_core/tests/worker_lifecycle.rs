//! Trigger worker startup and shutdown.
//!
//! Verifies that:
//! - Dropping a scheduler joins its worker without waiting out a settle delay
//! - Repeated build/drop cycles do not accumulate threads or hang
//! - An in-flight capture finishes before shutdown returns

mod common;

use common::wait_until;
use lapse_core::mocks::{NullActuator, ScriptedActuator};
use lapse_core::{LayerEdge, StatusBoard, TriggerCfg, TriggerScheduler};
use lapse_traits::clock::MonotonicClock;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn board() -> StatusBoard {
    StatusBoard::new(16, Arc::new(MonotonicClock::new()))
}

fn cfg(settle: Duration, busy_wait: Duration) -> TriggerCfg {
    TriggerCfg {
        settle,
        max_attempts: 1,
        retry_backoff: Duration::from_millis(1),
        busy_wait,
    }
}

#[test]
fn drop_with_pending_trigger_is_prompt() {
    let s = TriggerScheduler::spawn(
        ScriptedActuator::new(),
        cfg(Duration::from_secs(30), Duration::ZERO),
        MonotonicClock::new(),
        board(),
    );
    s.schedule(LayerEdge { layer: 1 }, Instant::now(), true, true)
        .expect("scheduled");
    let start = Instant::now();
    drop(s);
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[test]
fn repeated_spawn_and_drop() {
    for _ in 0..20 {
        let s = TriggerScheduler::spawn(
            NullActuator,
            TriggerCfg::default(),
            MonotonicClock::new(),
            board(),
        );
        std::thread::sleep(Duration::from_millis(1));
        drop(s);
    }
}

#[test]
fn shutdown_waits_for_in_flight_capture() {
    let act = ScriptedActuator::new();
    let calls = act.calls();
    let b = board();
    let mut s = TriggerScheduler::spawn(
        act,
        TriggerCfg {
            max_attempts: 3,
            ..cfg(Duration::ZERO, Duration::ZERO)
        },
        MonotonicClock::new(),
        b.clone(),
    );
    s.schedule(LayerEdge { layer: 2 }, Instant::now(), true, true)
        .expect("scheduled");
    assert!(wait_until(|| calls.captures() == 1));
    s.shutdown();
    assert_eq!(calls.captures(), 1);
    assert_eq!(b.last_outcome().as_deref(), Some("layer 2 captured (attempt 1)"));
}
