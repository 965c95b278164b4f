//! Camera link monitor: turns the bridge's connection state into
//! `Event::Link` messages on the ingestion channel.
//!
//! The actuator is shared with the trigger worker behind a mutex, so a link
//! check never interleaves with a capture on the helper's single command
//! stream.

use crossbeam_channel as xch;
use lapse_bridge::ProcessBridge;
use lapse_core::{Event, LinkEvent};
use lapse_traits::{Actuator, ActuatorStatus, BoxError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

/// An actuator whose link can be re-opened after it drops.
pub trait Reconnect: Actuator {
    fn reconnect(&mut self) -> Result<(), BoxError>;
}

impl Reconnect for ProcessBridge {
    fn reconnect(&mut self) -> Result<(), BoxError> {
        self.connect()
    }
}

fn lock<A>(a: &Mutex<A>) -> MutexGuard<'_, A> {
    a.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Actuator handle shared between the trigger worker and the monitor.
pub struct SharedActuator<A>(pub Arc<Mutex<A>>);

impl<A: Actuator> Actuator for SharedActuator<A> {
    fn is_ready(&mut self) -> bool {
        lock(&self.0).is_ready()
    }
    fn query_status(&mut self) -> Result<ActuatorStatus, BoxError> {
        lock(&self.0).query_status()
    }
    fn capture(&mut self) -> Result<(), BoxError> {
        lock(&self.0).capture()
    }
    fn recover(&mut self) -> Result<(), BoxError> {
        lock(&self.0).recover()
    }
}

/// Background link checker. Stops (and releases its event sender) on drop.
pub struct LinkMonitor {
    stop: Option<xch::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl LinkMonitor {
    /// Check the link every `interval`, reconnecting while it is down, and
    /// send a `Link` event whenever the state differs from the last one sent.
    /// `connected` is the state already announced.
    pub fn spawn<A: Reconnect + Send + 'static>(
        actuator: Arc<Mutex<A>>,
        connected: bool,
        events: xch::Sender<Event>,
        interval: Duration,
        shutdown: Arc<AtomicBool>,
    ) -> std::io::Result<Self> {
        let (stop, stop_rx) = xch::bounded::<()>(0);
        let handle = std::thread::Builder::new()
            .name("lapse-link".into())
            .spawn(move || {
                let mut connected = connected;
                while let Err(xch::RecvTimeoutError::Timeout) = stop_rx.recv_timeout(interval) {
                    if shutdown.load(Ordering::Relaxed) {
                        break;
                    }
                    let up = check(&actuator);
                    if up == connected {
                        continue;
                    }
                    connected = up;
                    let link = if up {
                        tracing::info!("camera link up");
                        LinkEvent::Connected
                    } else {
                        tracing::warn!("camera link lost; will keep reconnecting");
                        LinkEvent::Disconnected
                    };
                    if events.send(Event::Link(link)).is_err() {
                        break;
                    }
                }
                tracing::trace!("link monitor exiting");
            })?;
        Ok(Self {
            stop: Some(stop),
            handle: Some(handle),
        })
    }
}

fn check<A: Reconnect>(actuator: &Mutex<A>) -> bool {
    let mut a = lock(actuator);
    if a.is_ready() {
        return true;
    }
    match a.reconnect() {
        Ok(()) => a.is_ready(),
        Err(e) => {
            tracing::debug!(error = %e, "camera reconnect failed");
            false
        }
    }
}

impl Drop for LinkMonitor {
    fn drop(&mut self) {
        self.stop.take();
        if let Some(h) = self.handle.take()
            && h.join().is_err()
        {
            tracing::error!("link monitor panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapse_core::{DebounceCfg, Scheduler, TriggerCfg};
    use serde_json::json;
    use std::time::Instant;

    /// Camera whose link comes up after a number of refused connects.
    #[derive(Default)]
    struct FlakyCamera {
        up: bool,
        refusals: u32,
        photos: u32,
    }

    impl Actuator for FlakyCamera {
        fn is_ready(&mut self) -> bool {
            self.up
        }
        fn query_status(&mut self) -> Result<ActuatorStatus, BoxError> {
            Ok(ActuatorStatus::default())
        }
        fn capture(&mut self) -> Result<(), BoxError> {
            if !self.up {
                return Err("not connected".into());
            }
            self.photos += 1;
            Ok(())
        }
        fn recover(&mut self) -> Result<(), BoxError> {
            Ok(())
        }
    }

    impl Reconnect for FlakyCamera {
        fn reconnect(&mut self) -> Result<(), BoxError> {
            if self.refusals > 0 {
                self.refusals -= 1;
                return Err("connection refused".into());
            }
            self.up = true;
            Ok(())
        }
    }

    fn wait_until(mut f: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if f() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn reconnect_after_failed_start_lets_triggers_through() {
        let cam = Arc::new(Mutex::new(FlakyCamera {
            refusals: 2,
            ..FlakyCamera::default()
        }));
        let mut s = Scheduler::builder()
            .with_actuator(SharedActuator(cam.clone()))
            .with_debounce(DebounceCfg {
                dwell: Duration::ZERO,
            })
            .with_trigger(TriggerCfg {
                settle: Duration::ZERO,
                ..TriggerCfg::default()
            })
            .build()
            .expect("build");

        // Startup connect failed: the layer is dropped as not ready.
        let first = json!({"layer": 1, "total": 10, "armed": true});
        s.on_telemetry(&first);
        let out = s.on_telemetry(&first);
        assert!(out.edge.is_some());
        assert_eq!(out.scheduled, None);

        let (tx, rx) = xch::unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));
        let monitor =
            LinkMonitor::spawn(cam.clone(), false, tx, Duration::from_millis(5), shutdown)
                .expect("spawn monitor");
        let ev = rx.recv_timeout(Duration::from_secs(5)).expect("link event");
        assert!(matches!(ev, Event::Link(LinkEvent::Connected)));
        s.ingest(ev);
        assert!(s.status().actuator_ready);

        let out = s.on_telemetry(&json!({"layer": 2}));
        assert_eq!(out.scheduled.map(|t| t.layer), Some(2));
        assert!(wait_until(|| lock(&cam).photos == 1));

        // Dropping the monitor releases its sender.
        drop(monitor);
        assert!(matches!(
            rx.recv_timeout(Duration::from_millis(50)),
            Err(xch::RecvTimeoutError::Disconnected)
        ));
        s.shutdown();
    }

    #[test]
    fn lost_link_is_announced_once() {
        let cam = Arc::new(Mutex::new(FlakyCamera {
            up: true,
            refusals: u32::MAX,
            ..FlakyCamera::default()
        }));
        let (tx, rx) = xch::unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));
        let _monitor =
            LinkMonitor::spawn(cam.clone(), true, tx, Duration::from_millis(5), shutdown)
                .expect("spawn monitor");
        std::thread::sleep(Duration::from_millis(30));
        assert!(rx.try_recv().is_err(), "no event while the link is steady");

        lock(&cam).up = false;
        let ev = rx.recv_timeout(Duration::from_secs(5)).expect("link event");
        assert!(matches!(ev, Event::Link(LinkEvent::Disconnected)));
        std::thread::sleep(Duration::from_millis(30));
        assert!(rx.try_recv().is_err(), "disconnect is reported once");
    }
}
