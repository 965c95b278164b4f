//! Maps `Box<dyn Error>` from the `Actuator` boundary to a typed `ActuatorFault`.
//!
//! The trait in `lapse_traits` uses `Box<dyn Error + Send + Sync>` so any
//! bridge can plug in; this module converts those to our typed enum, with an
//! optional feature-gated path for `lapse_bridge::BridgeError` downcasting.

use crate::error::ActuatorFault;

/// Map a trait-boundary error to a typed `ActuatorFault`.
///
/// Attempts to downcast known bridge error types first, then falls back
/// to string-based heuristics.
pub fn map_actuator_error(e: &(dyn std::error::Error + 'static)) -> ActuatorFault {
    #[cfg(feature = "bridge-errors")]
    {
        use lapse_bridge::error::BridgeError;
        if let Some(be) = e.downcast_ref::<BridgeError>() {
            return match be {
                BridgeError::Timeout(_) => ActuatorFault::Timeout,
                BridgeError::Disconnected | BridgeError::NotConnected => {
                    ActuatorFault::Disconnected
                }
                BridgeError::Rejected(msg) => ActuatorFault::Rejected(msg.clone()),
                other => ActuatorFault::Other(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        ActuatorFault::Timeout
    } else if lower.contains("not connected") || lower.contains("disconnected") {
        ActuatorFault::Disconnected
    } else {
        ActuatorFault::Other(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_heuristics_classify_unknown_errors() {
        let e = std::io::Error::other("BLE read timed out");
        assert_eq!(map_actuator_error(&e), ActuatorFault::Timeout);
        let e = std::io::Error::other("Not connected");
        assert_eq!(map_actuator_error(&e), ActuatorFault::Disconnected);
        let e = std::io::Error::other("shutter jammed");
        assert_eq!(
            map_actuator_error(&e),
            ActuatorFault::Other("shutter jammed".into())
        );
    }

    #[cfg(feature = "bridge-errors")]
    #[test]
    fn bridge_errors_map_precisely() {
        use lapse_bridge::error::BridgeError;
        let e = BridgeError::Rejected("Photo failed: ErrorCode.BUSY".into());
        assert_eq!(
            map_actuator_error(&e),
            ActuatorFault::Rejected("Photo failed: ErrorCode.BUSY".into())
        );
        let e = BridgeError::NotConnected;
        assert_eq!(map_actuator_error(&e), ActuatorFault::Disconnected);
    }
}
