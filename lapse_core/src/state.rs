//! Printer state vocabulary and the priority-ordered classifier.

use crate::config::ClassifierCfg;
use crate::snapshot::PrinterSnapshot;
use serde::Serialize;

/// High-level printer state derived from one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum PrintState {
    #[default]
    Unknown,
    Printing,
    Heating,
    Standby,
    Idle,
    Finished,
}

impl PrintState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Printing => "Printing",
            Self::Heating => "Heating",
            Self::Standby => "Standby",
            Self::Idle => "Idle",
            Self::Finished => "Finished",
        }
    }

    /// States that close a job; the set of captured layers is forgotten on entry.
    #[inline]
    pub fn ends_job(self) -> bool {
        matches!(self, Self::Finished | Self::Idle)
    }
}

impl core::fmt::Display for PrintState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a snapshot. First matching rule wins:
///
/// 1. finish token in the state hint → `Finished`
/// 2. `0 < current_layer < total_layers` → `Printing`
/// 3. idle token in the state hint → `Idle`
/// 4. nozzle or bed above its heating threshold → `Heating`
/// 5. otherwise `Standby`
///
/// Layer counters outrank the idle token because vendor vocabulary drifts
/// between firmware versions while counters do not. `previous` only matters
/// when the layer total was never reported: a positive layer keeps an already
/// accepted `Printing` instead of dropping to a temperature rule.
pub fn classify(snapshot: &PrinterSnapshot, previous: PrintState, cfg: &ClassifierCfg) -> PrintState {
    if snapshot.hint_is(&cfg.finish_tokens) {
        return PrintState::Finished;
    }

    let layer = snapshot.layer();
    match snapshot.total_layers {
        Some(total) if layer > 0 && layer < total => return PrintState::Printing,
        None if layer > 0 && previous == PrintState::Printing => return PrintState::Printing,
        _ => {}
    }

    if snapshot.hint_is(&cfg.idle_tokens) {
        return PrintState::Idle;
    }

    if snapshot.nozzle_temperature_c > cfg.heating_nozzle_c
        || snapshot.bed_temperature_c > cfg.heating_bed_c
    {
        return PrintState::Heating;
    }

    PrintState::Standby
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn snap(layer: u32, total: Option<u32>, nozzle: f32, bed: f32, hint: &str) -> PrinterSnapshot {
        PrinterSnapshot {
            total_layers: total,
            current_layer: (layer > 0).then_some(layer),
            nozzle_temperature_c: nozzle,
            bed_temperature_c: bed,
            raw_state_hint: hint.to_string(),
            timelapse_armed: true,
            job_id: None,
        }
    }

    #[rstest]
    #[case(snap(50, Some(100), 220.0, 60.0, "FINISH"), PrintState::Finished)]
    #[case(snap(50, Some(100), 220.0, 60.0, "IDLE"), PrintState::Printing)]
    #[case(snap(50, Some(100), 20.0, 20.0, "running"), PrintState::Printing)]
    #[case(snap(100, Some(100), 220.0, 60.0, "RUNNING"), PrintState::Heating)]
    #[case(snap(0, Some(100), 220.0, 20.0, "IDLE"), PrintState::Idle)]
    #[case(snap(0, None, 151.0, 20.0, ""), PrintState::Heating)]
    #[case(snap(0, None, 150.0, 61.0, ""), PrintState::Heating)]
    #[case(snap(0, None, 150.0, 60.0, ""), PrintState::Standby)]
    #[case(snap(0, None, 25.0, 25.0, "PREPARE"), PrintState::Standby)]
    fn priority_chain(#[case] s: PrinterSnapshot, #[case] expected: PrintState) {
        let cfg = ClassifierCfg::default();
        assert_eq!(classify(&s, PrintState::Unknown, &cfg), expected);
    }

    #[test]
    fn finish_token_is_case_insensitive() {
        let cfg = ClassifierCfg::default();
        let s = snap(10, Some(20), 0.0, 0.0, "finish");
        assert_eq!(classify(&s, PrintState::Printing, &cfg), PrintState::Finished);
    }

    #[test]
    fn unknown_total_keeps_accepted_printing_only() {
        let cfg = ClassifierCfg::default();
        let s = snap(12, None, 210.0, 60.0, "RUNNING");
        assert_eq!(classify(&s, PrintState::Printing, &cfg), PrintState::Printing);
        assert_eq!(classify(&s, PrintState::Standby, &cfg), PrintState::Heating);
    }
}
