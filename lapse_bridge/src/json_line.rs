//! Actuator over a line-delimited JSON command channel.
//!
//! Requests are written to `W`; response lines arrive on a channel fed by
//! whoever reads the helper's output (see `ProcessBridge`). Each request
//! carries a fresh `commandId` and only the matching response is accepted.

use crossbeam_channel as xch;
use lapse_traits::{Actuator, ActuatorStatus, BoxError};
use std::io::Write;
use std::time::{Duration, Instant};

use crate::error::{BridgeError, Result};
use crate::protocol::{Command, Request, Response};

pub struct JsonLineBridge<W: Write> {
    writer: W,
    lines: xch::Receiver<String>,
    next_id: u64,
    timeout: Duration,
}

impl<W: Write> core::fmt::Debug for JsonLineBridge<W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JsonLineBridge")
            .field("next_id", &self.next_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl<W: Write> JsonLineBridge<W> {
    pub fn new(writer: W, lines: xch::Receiver<String>, timeout: Duration) -> Self {
        Self {
            writer,
            lines,
            next_id: 0,
            timeout,
        }
    }

    /// Send one command and wait for its response.
    pub fn request(&mut self, command: Command) -> Result<Response> {
        self.next_id += 1;
        let id = self.next_id;
        let mut line = serde_json::to_string(&Request {
            command,
            command_id: id,
        })
        .map_err(|e| BridgeError::Protocol(e.to_string()))?;
        line.push('\n');
        if let Err(e) = self
            .writer
            .write_all(line.as_bytes())
            .and_then(|()| self.writer.flush())
        {
            return Err(match e.kind() {
                std::io::ErrorKind::BrokenPipe => BridgeError::Disconnected,
                _ => BridgeError::Io(e),
            });
        }
        tracing::trace!(?command, id, "bridge request sent");

        let deadline = Instant::now() + self.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let raw = match self.lines.recv_timeout(remaining) {
                Ok(raw) => raw,
                Err(xch::RecvTimeoutError::Timeout) => {
                    tracing::warn!(?command, id, "bridge command timed out");
                    return Err(BridgeError::Timeout(self.timeout));
                }
                Err(xch::RecvTimeoutError::Disconnected) => return Err(BridgeError::Disconnected),
            };
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            let resp: Response = match serde_json::from_str(trimmed) {
                Ok(r) => r,
                Err(e) => {
                    tracing::debug!(error = %e, line = trimmed, "skipping non-protocol line");
                    continue;
                }
            };
            match resp.command_id {
                Some(rid) if rid == id => return Ok(resp),
                other => {
                    tracing::debug!(expected = id, got = ?other, "skipping stale response");
                }
            }
        }
    }

    /// Send `command` and require `success: true`.
    fn expect_success(&mut self, command: Command) -> Result<Response> {
        let resp = self.request(command)?;
        if resp.success {
            return Ok(resp);
        }
        let msg = resp
            .error
            .unwrap_or_else(|| format!("{command:?} failed"));
        if msg.eq_ignore_ascii_case("not connected") {
            Err(BridgeError::NotConnected)
        } else {
            Err(BridgeError::Rejected(msg))
        }
    }

    /// Open the camera link.
    pub fn connect(&mut self) -> Result<()> {
        let resp = self.expect_success(Command::Connect)?;
        if resp.connected == Some(false) {
            return Err(BridgeError::NotConnected);
        }
        tracing::info!("camera connected");
        Ok(())
    }

    pub fn disconnect(&mut self) -> Result<()> {
        self.expect_success(Command::Disconnect).map(|_| ())
    }

    pub fn check_connection(&mut self) -> Result<bool> {
        let resp = self.expect_success(Command::CheckConnection)?;
        Ok(resp.connected == Some(true))
    }

    pub fn status(&mut self) -> Result<ActuatorStatus> {
        let resp = self.expect_success(Command::Status)?;
        resp.status
            .map(|s| s.to_status())
            .ok_or_else(|| BridgeError::Protocol("status response without status".into()))
    }

    pub fn take_photo(&mut self) -> Result<()> {
        self.expect_success(Command::TakePhoto).map(|_| ())
    }
}

impl<W: Write> Actuator for JsonLineBridge<W> {
    fn is_ready(&mut self) -> bool {
        match self.check_connection() {
            Ok(up) => up,
            Err(e) => {
                tracing::debug!(error = %e, "connection check failed");
                false
            }
        }
    }

    fn query_status(&mut self) -> std::result::Result<ActuatorStatus, BoxError> {
        Ok(self.status()?)
    }

    fn capture(&mut self) -> std::result::Result<(), BoxError> {
        Ok(self.take_photo()?)
    }

    /// Forced link reset: disconnect (best effort) then reconnect.
    fn recover(&mut self) -> std::result::Result<(), BoxError> {
        if let Err(e) = self.disconnect() {
            tracing::debug!(error = %e, "disconnect before reconnect failed");
        }
        Ok(self.connect()?)
    }
}
