//! Telemetry normalizer: heterogeneous vendor records to `PrinterSnapshot`.
//!
//! Vendor reports are frequently partial, so every logical field is resolved
//! independently from an ordered alias list and falls back to the last known
//! value when absent. Nothing here fails; unparseable fields count as absent.

use serde::Serialize;
use serde_json::Value;

const TOTAL_LAYER_KEYS: &[&str] = &[
    "total_layer_num",
    "total_layers",
    "totalLayers",
    "layer_count",
    "total",
];
const CURRENT_LAYER_KEYS: &[&str] = &["layer_num", "current_layer", "currentLayer", "layer"];
const NOZZLE_KEYS: &[&str] = &["nozzle_temper", "nozzle_temp", "nozzleTemperature", "nozzle"];
const BED_KEYS: &[&str] = &["bed_temper", "bed_temp", "bedTemperature", "bed"];
const STATE_KEYS: &[&str] = &["gcode_state", "state", "print_state", "status"];
const ARMED_KEYS: &[&str] = &["timelapse", "ipcam.timelapse", "timelapse_armed", "armed"];
const JOB_KEYS: &[&str] = &["subtask_id", "task_id", "job_id"];

/// Hints that mark the start of a new job; a smaller layer total is only
/// believed alongside one of these (or a new job id).
const JOB_START_HINTS: &[&str] = &["PREPARE", "SLICING"];

/// One normalized printer status reading.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PrinterSnapshot {
    pub total_layers: Option<u32>,
    pub current_layer: Option<u32>,
    pub nozzle_temperature_c: f32,
    pub bed_temperature_c: f32,
    /// Vendor state token, trimmed; only used as a classifier tie-break.
    pub raw_state_hint: String,
    pub timelapse_armed: bool,
    pub job_id: Option<String>,
}

impl PrinterSnapshot {
    /// Current layer, or 0 when never reported.
    #[inline]
    pub fn layer(&self) -> u32 {
        self.current_layer.unwrap_or(0)
    }

    /// True when the state hint matches one of `tokens` (upper-case).
    pub fn hint_is(&self, tokens: &[String]) -> bool {
        let hint = self.raw_state_hint.to_ascii_uppercase();
        !hint.is_empty() && tokens.iter().any(|t| *t == hint)
    }
}

/// Carry-forward normalizer. Owns the last known value of every field.
#[derive(Debug, Default)]
pub struct Normalizer {
    last: PrinterSnapshot,
    job_started: bool,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last snapshot produced (or the empty default).
    pub fn last(&self) -> &PrinterSnapshot {
        &self.last
    }

    /// True when the last record began a new job: the job id changed from a
    /// known value, or the state hint switched to a job-start token.
    pub fn job_started(&self) -> bool {
        self.job_started
    }

    /// Drop the layer counters at a job boundary. Later zero or absent
    /// reports then leave them unset instead of carrying the old job forward.
    pub fn reset_job(&mut self) {
        self.last.current_layer = None;
        self.last.total_layers = None;
    }

    /// Map one raw record to a snapshot. Never fails.
    pub fn normalize(&mut self, raw: &Value) -> PrinterSnapshot {
        let body = payload_body(raw);
        let prev = &self.last;
        let mut next = prev.clone();

        let hint = first_str(body, STATE_KEYS);
        let entering_start = hint
            .as_deref()
            .is_some_and(|h| is_job_start(h) && !is_job_start(&prev.raw_state_hint));
        if let Some(hint) = hint {
            next.raw_state_hint = hint;
        }

        let job_changed = match first_job_id(body) {
            Some(id) if prev.job_id.as_deref() != Some(id.as_str()) => {
                let had_job = prev.job_id.is_some();
                next.job_id = Some(id);
                had_job
            }
            _ => false,
        };
        let job_start = job_changed || is_job_start(&next.raw_state_hint);
        if job_changed || entering_start {
            // Counters from the previous job must not leak into the new one.
            next.total_layers = None;
            next.current_layer = None;
        }

        if let Some(total) = first_positive(body, TOTAL_LAYER_KEYS) {
            match next.total_layers {
                Some(known) if total < known && !job_start => {
                    tracing::debug!(known, reported = total, "ignoring regressed layer total");
                }
                _ => next.total_layers = Some(total),
            }
        }
        if let Some(layer) = first_positive(body, CURRENT_LAYER_KEYS) {
            next.current_layer = Some(layer);
        }
        if let Some(t) = first_f32(body, NOZZLE_KEYS) {
            next.nozzle_temperature_c = t;
        }
        if let Some(t) = first_f32(body, BED_KEYS) {
            next.bed_temperature_c = t;
        }
        if let Some(armed) = first_armed(body) {
            next.timelapse_armed = armed;
        }

        tracing::trace!(
            layer = ?next.current_layer,
            total = ?next.total_layers,
            hint = %next.raw_state_hint,
            armed = next.timelapse_armed,
            "telemetry normalized"
        );
        self.job_started = job_changed || entering_start;
        self.last = next.clone();
        next
    }
}

fn is_job_start(hint: &str) -> bool {
    JOB_START_HINTS.iter().any(|h| hint.eq_ignore_ascii_case(h))
}

/// Unwrap the common `{"print": {...}}` report envelope.
fn payload_body(raw: &Value) -> &Value {
    match raw.get("print") {
        Some(inner @ Value::Object(_)) => inner,
        _ => raw,
    }
}

/// Resolve a dotted path (`"ipcam.timelapse"`) inside an object.
fn lookup<'a>(body: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(body, |v, key| v.get(key))
        .filter(|v| !v.is_null())
}

fn as_u32(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                u32::try_from(u).ok()
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0 && *f <= f64::from(u32::MAX))
                    .map(|f| f as u32)
            }
        }
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

fn as_f32(v: &Value) -> Option<f32> {
    let f = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    let f = f as f32;
    f.is_finite().then_some(f)
}

fn as_armed(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "enable" | "enabled" | "on" | "true" | "1" => Some(true),
            "disable" | "disabled" | "off" | "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn first_positive(body: &Value, keys: &[&str]) -> Option<u32> {
    keys.iter()
        .filter_map(|k| lookup(body, k).and_then(as_u32))
        .find(|v| *v > 0)
}

fn first_f32(body: &Value, keys: &[&str]) -> Option<f32> {
    keys.iter().find_map(|k| lookup(body, k).and_then(as_f32))
}

fn first_str(body: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| {
        lookup(body, k)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

fn first_armed(body: &Value) -> Option<bool> {
    ARMED_KEYS
        .iter()
        .find_map(|k| lookup(body, k).and_then(as_armed))
}

fn first_job_id(body: &Value) -> Option<String> {
    JOB_KEYS.iter().find_map(|k| match lookup(body, k)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty() && s != "0").then(|| s.to_string())
        }
        Value::Number(n) => n
            .as_u64()
            .filter(|id| *id != 0)
            .map(|id| id.to_string()),
        _ => None,
    })
}
