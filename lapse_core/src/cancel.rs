//! Cancellation for the trigger worker's timed waits.
//!
//! Nothing is ever sent on the channel: dropping the `CancelHandle`
//! disconnects it, which wakes every waiter at once.

use crossbeam_channel as xch;
use std::time::Duration;

/// Owning side; drop or call `cancel()` to stop all waits.
#[derive(Debug)]
pub struct CancelHandle {
    tx: Option<xch::Sender<()>>,
}

/// Waiting side, cheap to clone.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: xch::Receiver<()>,
}

pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = xch::bounded(0);
    (CancelHandle { tx: Some(tx) }, CancelToken { rx })
}

impl CancelHandle {
    pub fn cancel(&mut self) {
        self.tx.take();
    }
}

impl CancelToken {
    /// Sleep for `d`. Returns false if cancelled before (or while) waiting.
    pub fn wait(&self, d: Duration) -> bool {
        matches!(
            self.rx.recv_timeout(d),
            Err(xch::RecvTimeoutError::Timeout)
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.rx.try_recv(), Err(xch::TryRecvError::Disconnected))
    }

    /// Receiver for use in `select!`.
    pub(crate) fn receiver(&self) -> &xch::Receiver<()> {
        &self.rx
    }
}
