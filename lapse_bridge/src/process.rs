//! Capture helper run as a child process speaking the JSON-lines protocol.

use crossbeam_channel as xch;
use lapse_traits::{Actuator, ActuatorStatus, BoxError};
use std::io::{BufRead, BufReader};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::error::Result;
use crate::json_line::JsonLineBridge;
use crate::util::wait_until_with_timeout;

/// How long the helper gets to exit on its own after stdin closes.
const EXIT_GRACE: Duration = Duration::from_millis(500);

pub struct ProcessBridge {
    bridge: Option<JsonLineBridge<ChildStdin>>,
    child: Child,
    reader: Option<JoinHandle<()>>,
}

impl core::fmt::Debug for ProcessBridge {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProcessBridge")
            .field("pid", &self.child.id())
            .finish()
    }
}

impl ProcessBridge {
    /// Launch `program` with piped stdin/stdout. The helper's stderr is
    /// inherited so its own logging stays visible.
    pub fn spawn(program: &str, args: &[String], timeout: Duration) -> Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(i), Some(o)) => (i, o),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(std::io::Error::other("helper stdio not piped").into());
            }
        };

        let (tx, rx) = xch::unbounded::<String>();
        let reader = std::thread::Builder::new()
            .name("lapse-bridge-reader".into())
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    let Ok(line) = line else { break };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                tracing::trace!("bridge reader exiting");
            })?;

        tracing::info!(program, pid = child.id(), "capture helper started");
        Ok(Self {
            bridge: Some(JsonLineBridge::new(stdin, rx, timeout)),
            child,
            reader: Some(reader),
        })
    }

    fn bridge(&mut self) -> std::result::Result<&mut JsonLineBridge<ChildStdin>, BoxError> {
        self.bridge
            .as_mut()
            .ok_or_else(|| Box::new(crate::error::BridgeError::Disconnected) as BoxError)
    }

    /// Open the camera link.
    pub fn connect(&mut self) -> std::result::Result<(), BoxError> {
        Ok(self.bridge()?.connect()?)
    }
}

impl Actuator for ProcessBridge {
    fn is_ready(&mut self) -> bool {
        self.bridge.as_mut().is_some_and(|b| b.is_ready())
    }

    fn query_status(&mut self) -> std::result::Result<ActuatorStatus, BoxError> {
        self.bridge()?.query_status()
    }

    fn capture(&mut self) -> std::result::Result<(), BoxError> {
        self.bridge()?.capture()
    }

    fn recover(&mut self) -> std::result::Result<(), BoxError> {
        self.bridge()?.recover()
    }
}

impl Drop for ProcessBridge {
    fn drop(&mut self) {
        // Closing stdin is the helper's signal to disconnect and exit.
        self.bridge.take();
        let child = &mut self.child;
        let exited = wait_until_with_timeout(
            || matches!(child.try_wait(), Ok(Some(_))),
            EXIT_GRACE,
            Duration::from_millis(10),
        );
        if exited.is_err() {
            tracing::warn!(pid = self.child.id(), "capture helper did not exit; killing");
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
        if let Some(h) = self.reader.take() {
            let _ = h.join();
        }
    }
}
