//! Quick Start Example
//!
//! Replays a short synthetic print through the pipeline with a scripted
//! camera and prints the final status. Run with
//! `cargo run -p lapse_core --example quick_start`.

use lapse_core::mocks::ScriptedActuator;
use lapse_core::{DebounceCfg, Event, LinkEvent, Scheduler, TriggerCfg};
use serde_json::json;
use std::time::Duration;

fn main() -> Result<(), eyre::Report> {
    let camera = ScriptedActuator::new().failing_captures(1);
    let calls = camera.calls();

    let mut scheduler = Scheduler::builder()
        .with_actuator(camera)
        .with_debounce(DebounceCfg {
            dwell: Duration::from_millis(50),
        })
        .with_trigger(TriggerCfg {
            settle: Duration::from_millis(20),
            retry_backoff: Duration::from_millis(20),
            ..TriggerCfg::default()
        })
        .build()?;

    scheduler.ingest(Event::Link(LinkEvent::Connected));
    for layer in 1..=5u32 {
        for _ in 0..3 {
            let out = scheduler.ingest(Event::Telemetry(json!({
                "print": {
                    "gcode_state": "RUNNING",
                    "layer_num": layer,
                    "total_layer_num": 6,
                    "nozzle_temper": 220.0,
                    "ipcam": {"timelapse": "enable"}
                }
            })));
            if let Some(t) = out.scheduled {
                println!("layer {} scheduled", t.layer);
            }
            std::thread::sleep(Duration::from_millis(40));
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    scheduler.shutdown();

    let status = scheduler.status();
    println!("captures attempted: {}", calls.captures());
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
