#![no_main]
use lapse_core::state::classify;
use lapse_core::{ClassifierCfg, Normalizer, PrintState};
use libfuzzer_sys::fuzz_target;

// Feed arbitrary JSON lines through one long-lived normalizer, the way a
// noisy printer link would, and classify every snapshot.
fuzz_target!(|data: &[u8]| {
    let cfg = ClassifierCfg::default();
    let mut n = Normalizer::new();
    let mut prev = PrintState::Unknown;
    for line in data.split(|b| *b == b'\n') {
        let Ok(v) = serde_json::from_slice::<serde_json::Value>(line) else {
            continue;
        };
        let snap = n.normalize(&v);
        if let (Some(total), Some(layer)) = (snap.total_layers, snap.current_layer) {
            assert!(total > 0 && layer > 0);
        }
        prev = classify(&snap, prev, &cfg);
    }
});
