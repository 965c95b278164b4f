#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the layer-capture daemon.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Every section has defaults, so an empty file is a valid config.
use serde::Deserialize;
use serde::de::Deserializer;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DebounceCfg {
    /// How long a candidate printer state must persist before it is accepted.
    pub dwell_ms: u64,
}

impl Default for DebounceCfg {
    fn default() -> Self {
        Self { dwell_ms: 5_000 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TriggerCfg {
    /// Wait after a layer edge before the shutter fires.
    pub settle_ms: u64,
    /// Capture attempts per layer before recovery.
    pub max_attempts: u32,
    /// Pause between failed attempts.
    pub retry_backoff_ms: u64,
    /// Extra wait when the camera reports busy, before re-querying once.
    pub busy_wait_ms: u64,
}

impl Default for TriggerCfg {
    fn default() -> Self {
        Self {
            settle_ms: 800,
            max_attempts: 3,
            retry_backoff_ms: 1_000,
            busy_wait_ms: 1_000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ClassifierCfg {
    /// Nozzle above this (°C) counts as heating.
    pub heating_nozzle_c: f32,
    /// Bed above this (°C) counts as heating.
    pub heating_bed_c: f32,
    /// Vendor state tokens meaning "job finished". Accepts an array or a
    /// comma-separated string.
    #[serde(deserialize_with = "de_tokens")]
    pub finish_tokens: Vec<String>,
    /// Vendor state tokens meaning "idle".
    #[serde(deserialize_with = "de_tokens")]
    pub idle_tokens: Vec<String>,
}

impl Default for ClassifierCfg {
    fn default() -> Self {
        Self {
            heating_nozzle_c: 150.0,
            heating_bed_c: 60.0,
            finish_tokens: vec!["FINISH".into(), "FINISHED".into(), "COMPLETED".into()],
            idle_tokens: vec!["IDLE".into()],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StatusCfg {
    /// Rolling log capacity (lines); oldest entries are dropped.
    pub log_capacity: usize,
    /// Optional path for an atomically rewritten JSON status snapshot.
    pub file: Option<String>,
}

impl Default for StatusCfg {
    fn default() -> Self {
        Self {
            log_capacity: 400,
            file: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BridgeCfg {
    /// Helper program speaking the JSON-line camera protocol. When absent
    /// the simulated camera is used.
    pub command: Option<String>,
    pub args: Vec<String>,
    /// Per-request response timeout.
    pub command_timeout_ms: u64,
    /// How often the camera link is checked, and reconnected when down.
    pub link_check_ms: u64,
}

impl Default for BridgeCfg {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            command_timeout_ms: 5_000,
            link_check_ms: 2_000,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ActuatorCfg {
    /// Treat the camera link as up before any connect event arrives.
    pub assume_ready: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub debounce: DebounceCfg,
    pub trigger: TriggerCfg,
    pub classifier: ClassifierCfg,
    pub status: StatusCfg,
    pub logging: Logging,
    pub bridge: BridgeCfg,
    pub actuator: ActuatorCfg,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TokensToml {
    List(Vec<String>),
    Csv(String),
}

fn de_tokens<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = TokensToml::deserialize(deserializer)?;
    let items = match raw {
        TokensToml::List(v) => v,
        TokensToml::Csv(s) => s.split(',').map(str::to_string).collect(),
    };
    Ok(items
        .into_iter()
        .map(|t| t.trim().to_ascii_uppercase())
        .filter(|t| !t.is_empty())
        .collect())
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))?;
    cfg.validate()?;
    Ok(cfg)
}

const TEN_MINUTES_MS: u64 = 10 * 60 * 1000;

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Debounce
        if self.debounce.dwell_ms > TEN_MINUTES_MS {
            eyre::bail!("debounce.dwell_ms is unreasonably large (>10min)");
        }

        // Trigger
        if self.trigger.max_attempts == 0 {
            eyre::bail!("trigger.max_attempts must be >= 1");
        }
        if self.trigger.max_attempts > 10 {
            eyre::bail!("trigger.max_attempts must be <= 10");
        }
        if self.trigger.settle_ms > 60_000 {
            eyre::bail!("trigger.settle_ms is unreasonably large (>60s)");
        }
        if self.trigger.retry_backoff_ms > 60_000 {
            eyre::bail!("trigger.retry_backoff_ms is unreasonably large (>60s)");
        }
        if self.trigger.busy_wait_ms > 60_000 {
            eyre::bail!("trigger.busy_wait_ms is unreasonably large (>60s)");
        }

        // Classifier
        for (name, v) in [
            ("classifier.heating_nozzle_c", self.classifier.heating_nozzle_c),
            ("classifier.heating_bed_c", self.classifier.heating_bed_c),
        ] {
            if !v.is_finite() || v < 0.0 {
                eyre::bail!("{name} must be a finite value >= 0");
            }
        }
        if self.classifier.finish_tokens.is_empty() {
            eyre::bail!("classifier.finish_tokens must not be empty");
        }
        if self.classifier.idle_tokens.is_empty() {
            eyre::bail!("classifier.idle_tokens must not be empty");
        }

        // Status
        if self.status.log_capacity == 0 {
            eyre::bail!("status.log_capacity must be >= 1");
        }

        // Bridge
        if self.bridge.command_timeout_ms == 0 {
            eyre::bail!("bridge.command_timeout_ms must be >= 1");
        }
        if self.bridge.link_check_ms == 0 {
            eyre::bail!("bridge.link_check_ms must be >= 1");
        }
        if let Some(cmd) = &self.bridge.command
            && cmd.trim().is_empty()
        {
            eyre::bail!("bridge.command must not be blank when set");
        }

        // Logging
        if let Some(rot) = &self.logging.rotation
            && !matches!(rot.to_ascii_lowercase().as_str(), "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot:?}");
        }

        Ok(())
    }
}
