//! Layer-edge detection while the accepted state is `Printing`.

use crate::snapshot::PrinterSnapshot;
use crate::state::PrintState;
use std::collections::BTreeSet;

/// A confirmed, not-yet-triggered layer number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerEdge {
    pub layer: u32,
}

/// Per-job layer bookkeeping.
///
/// A layer is marked as seen the moment its edge is emitted, whatever the
/// scheduler later decides, so a layer is offered at most once per job even
/// when the printer resends it after reconnecting. `last_triggered` only
/// moves when the scheduler accepts an edge.
#[derive(Debug, Default, Clone)]
pub struct LayerProgress {
    current_layer: u32,
    last_triggered: Option<u32>,
    seen: BTreeSet<u32>,
}

impl LayerProgress {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn current_layer(&self) -> u32 {
        self.current_layer
    }

    /// Most recent layer a trigger was scheduled for; `None` is the "below
    /// any valid layer" sentinel.
    #[inline]
    pub fn last_triggered(&self) -> Option<u32> {
        self.last_triggered
    }

    pub fn already_seen(&self, layer: u32) -> bool {
        self.seen.contains(&layer)
    }

    /// Called when the scheduler accepted the edge for `layer`.
    pub fn record_triggered(&mut self, layer: u32) {
        self.seen.insert(layer);
        self.last_triggered = Some(layer);
    }

    /// Forget captured layers at a job boundary.
    pub fn reset_job(&mut self) {
        if !self.seen.is_empty() {
            tracing::debug!(layers = self.seen.len(), "layer history cleared for new job");
        }
        self.seen.clear();
        self.last_triggered = None;
        self.current_layer = 0;
    }

    /// Offer the accepted state and latest snapshot. Returns an edge only for
    /// a positive layer, while printing, that has not been offered before.
    pub fn on_accepted_state(
        &mut self,
        state: PrintState,
        snapshot: &PrinterSnapshot,
    ) -> Option<LayerEdge> {
        let layer = snapshot.layer();
        if layer > 0 {
            self.current_layer = layer;
        }
        if state != PrintState::Printing || layer == 0 {
            return None;
        }
        if Some(layer) == self.last_triggered || !self.seen.insert(layer) {
            return None;
        }
        Some(LayerEdge { layer })
    }
}
