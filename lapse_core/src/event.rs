//! Inputs to the ingestion path.

use serde_json::Value;

/// One item on the ingestion stream, processed strictly in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A raw printer telemetry record.
    Telemetry(Value),
    /// Actuator link state change reported by the bridge.
    Link(LinkEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    Connected,
    Disconnected,
}

impl From<Value> for Event {
    fn from(v: Value) -> Self {
        Self::Telemetry(v)
    }
}

impl From<LinkEvent> for Event {
    fn from(l: LinkEvent) -> Self {
        Self::Link(l)
    }
}
