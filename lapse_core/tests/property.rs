use lapse_core::debounce::{DebounceContext, Debounced};
use lapse_core::layer::LayerProgress;
use lapse_core::{Normalizer, PrintState, PrinterSnapshot};
use proptest::prelude::*;
use serde_json::json;
use std::collections::HashSet;
use std::time::{Duration, Instant};

const DWELL: Duration = Duration::from_millis(5_000);

fn printing_at(layer: u32) -> PrinterSnapshot {
    PrinterSnapshot {
        current_layer: Some(layer),
        total_layers: Some(1_000),
        timelapse_armed: true,
        ..PrinterSnapshot::default()
    }
}

prop_compose! {
    // Gaps that together stay below the dwell threshold.
    fn fast_gaps(n: usize)(gaps in prop::collection::vec(0u64..100, n)) -> Vec<u64> {
        gaps
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256, .. ProptestConfig::default()
    })]

    #[test]
    fn each_layer_edge_fires_at_most_once(layers in prop::collection::vec(0u32..40, 1..300)) {
        let mut p = LayerProgress::new();
        let mut fired = HashSet::new();
        for l in layers {
            if let Some(edge) = p.on_accepted_state(PrintState::Printing, &printing_at(l)) {
                prop_assert!(edge.layer > 0);
                prop_assert!(fired.insert(edge.layer), "layer {} fired twice", edge.layer);
                p.record_triggered(edge.layer);
            }
        }
    }

    #[test]
    fn flapping_faster_than_dwell_never_promotes(
        n in 2usize..40,
        gaps in fast_gaps(40),
    ) {
        let t0 = Instant::now();
        let mut ctx = DebounceContext::new(DWELL);
        let mut t = t0;
        for (i, g) in gaps.iter().take(n).enumerate() {
            let s = if i % 2 == 0 { PrintState::Heating } else { PrintState::Printing };
            t += Duration::from_millis(*g);
            let out = ctx.update(s, t);
            prop_assert_eq!(out, Debounced::Held(PrintState::Unknown));
        }
        prop_assert_eq!(ctx.accepted(), PrintState::Unknown);
    }

    #[test]
    fn persistent_candidate_promotes_exactly_once(
        gaps in prop::collection::vec(1u64..3_000, 1..20),
    ) {
        let t0 = Instant::now();
        let mut ctx = DebounceContext::new(DWELL);
        ctx.update(PrintState::Printing, t0);
        let mut t = t0;
        let mut elapsed = 0u64;
        let mut promotions = 0;
        for g in gaps.iter().copied().chain(std::iter::once(5_000)) {
            t += Duration::from_millis(g);
            elapsed += g;
            if let Debounced::Promoted { from, to } = ctx.update(PrintState::Printing, t) {
                promotions += 1;
                prop_assert_eq!(from, PrintState::Unknown);
                prop_assert_eq!(to, PrintState::Printing);
                prop_assert!(elapsed >= 5_000);
            }
        }
        prop_assert_eq!(promotions, 1);
        prop_assert_eq!(ctx.accepted(), PrintState::Printing);
    }

    #[test]
    fn absent_layer_never_resets_known_layer(
        layer in 1u32..10_000,
        temps in prop::collection::vec((0.0f64..300.0, 0.0f64..120.0), 1..30),
    ) {
        let mut n = Normalizer::new();
        n.normalize(&json!({"layer_num": layer, "total_layer_num": 10_000}));
        for (nozzle, bed) in temps {
            let snap = n.normalize(&json!({"nozzle_temper": nozzle, "bed_temper": bed, "layer_num": null}));
            prop_assert_eq!(snap.current_layer, Some(layer));
            prop_assert_eq!(snap.total_layers, Some(10_000));
        }
    }
}
