#![allow(dead_code)]

use lapse_core::mocks::ScriptedActuator;
use lapse_core::{DebounceCfg, Scheduler, TriggerCfg};
use lapse_traits::clock::test_clock::TestClock;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Poll `f` until it holds or five seconds pass.
pub fn wait_until(mut f: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if f() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    false
}

pub fn fast_trigger() -> TriggerCfg {
    TriggerCfg {
        settle: Duration::from_millis(5),
        max_attempts: 3,
        retry_backoff: Duration::from_millis(5),
        busy_wait: Duration::from_millis(5),
    }
}

/// Pipeline on a test clock with a 5 s dwell and a ready actuator.
pub fn pipeline(clock: &TestClock, actuator: ScriptedActuator, trigger: TriggerCfg) -> Scheduler {
    Scheduler::builder()
        .with_actuator(actuator)
        .with_clock(Arc::new(clock.clone()))
        .with_debounce(DebounceCfg {
            dwell: Duration::from_secs(5),
        })
        .with_trigger(trigger)
        .with_actuator_ready(true)
        .build()
        .expect("build scheduler")
}
