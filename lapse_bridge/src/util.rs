use std::time::{Duration, Instant};

use crate::error::{BridgeError, Result};

/// Poll `done` until it returns true or `timeout` expires. Sleeps in small
/// intervals to avoid spinning.
pub fn wait_until_with_timeout(
    mut done: impl FnMut() -> bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    while !done() {
        if Instant::now() >= deadline {
            return Err(BridgeError::Timeout(timeout));
        }
        std::thread::sleep(poll_interval);
    }
    Ok(())
}
