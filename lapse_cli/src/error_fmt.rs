//! Human-readable error descriptions and structured JSON error formatting.

/// Context attached to every config load/validation failure; exit code 2
/// keys off it.
pub const INVALID_CONFIG: &str = "invalid configuration";

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use lapse_bridge::BridgeError;
    use lapse_core::BuildError;

    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingActuator => {
                "What happened: No camera actuator was provided to the pipeline.\nLikely causes: The bridge failed to initialize or was not wired into the builder.\nHow to fix: Configure [bridge] command, or omit it to use the simulated camera.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun `lapse check-config`."
            ),
        };
    }

    if let Some(be) = err.downcast_ref::<BridgeError>() {
        return match be {
            BridgeError::Io(e) => format!(
                "What happened: The capture helper could not be started ({e}).\nLikely causes: Wrong [bridge] command path or missing interpreter.\nHow to fix: Check [bridge] command and args, or remove them to use the simulated camera."
            ),
            other => format!(
                "What happened: Camera bridge error: {other}.\nLikely causes: Helper crashed or camera out of range.\nHow to fix: Re-run with --log-level=debug and check the helper's stderr."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains(INVALID_CONFIG) {
        let detail = err
            .chain()
            .nth(1)
            .map_or_else(String::new, |c| format!(" ({c})"));
        return format!(
            "What happened: Configuration is invalid{detail}.\nLikely causes: A malformed TOML file or an out-of-range value.\nHow to fix: Edit the TOML config and run `lapse check-config`."
        );
    }

    if lower.contains("open telemetry") {
        let cause = err.root_cause();
        return format!(
            "What happened: The telemetry file could not be opened ({cause}).\nHow to fix: Check the --telemetry path, or pass `-` to read stdin."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// 2 for configuration problems, 1 for everything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(lapse_core::BuildError::InvalidConfig(_)) = err.downcast_ref() {
        return 2;
    }
    if err.to_string().contains(INVALID_CONFIG) {
        return 2;
    }
    1
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;
    let reason = if exit_code_for_error(err) == 2 {
        "InvalidConfig"
    } else {
        "Error"
    };
    json!({ "reason": reason, "message": humanize(err) }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;

    #[test]
    fn config_errors_exit_two() {
        let err: eyre::Report = Err::<(), _>(eyre::eyre!("trigger.max_attempts must be >= 1"))
            .wrap_err(INVALID_CONFIG)
            .unwrap_err();
        assert_eq!(exit_code_for_error(&err), 2);
        assert!(humanize(&err).contains("max_attempts"));
        assert!(format_error_json(&err).contains("InvalidConfig"));
    }

    #[test]
    fn build_errors_are_explained() {
        let err = eyre::Report::new(lapse_core::BuildError::MissingActuator);
        assert_eq!(exit_code_for_error(&err), 1);
        assert!(humanize(&err).contains("actuator"));
    }
}
