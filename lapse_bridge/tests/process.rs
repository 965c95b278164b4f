#![cfg(unix)]

use lapse_bridge::ProcessBridge;
use lapse_bridge::error::BridgeError;
use lapse_traits::Actuator;
use std::time::{Duration, Instant};

#[test]
fn missing_program_is_an_io_error() {
    let err = ProcessBridge::spawn("/nonexistent/lapse-helper", &[], Duration::from_millis(50))
        .expect_err("spawn should fail");
    assert!(matches!(err, BridgeError::Io(_)));
}

// `cat` echoes each request back: ids match but `success` is absent, so
// every command is refused. Exercises the full pipe round trip.
#[test]
fn echo_helper_round_trips_and_refuses() {
    let mut b = ProcessBridge::spawn("cat", &[], Duration::from_secs(2)).expect("spawn cat");
    assert!(!b.is_ready());
    let err = b.capture().expect_err("echo is not a success");
    assert!(matches!(
        err.downcast_ref::<BridgeError>(),
        Some(BridgeError::Rejected(_))
    ));
    let start = Instant::now();
    drop(b);
    assert!(start.elapsed() < Duration::from_secs(2));
}
