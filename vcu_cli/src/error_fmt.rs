//! Human-readable error descriptions and structured JSON error formatting.

/// Map an eyre::Report to a human-readable explanation with likely causes
/// and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use vcu_core::error::{ConfigError, VcuError};

    // Typed matches first
    if let Some(ce) = err.downcast_ref::<ConfigError>() {
        return match ce {
            ConfigError::ZeroPeriod(name) => format!(
                "What happened: The task '{name}' was registered with a zero period.\nLikely causes: A period in [scheduler] is 0 or missing.\nHow to fix: Set every *_ms in [scheduler] to at least the tick period."
            ),
            ConfigError::TaskTableFull(n) => format!(
                "What happened: The scheduler task table overflowed ({n} slots).\nLikely causes: A build registered more periodic tasks than the table holds.\nHow to fix: This is a build defect; raise the table capacity."
            ),
            ConfigError::InvalidTable(msg) => format!(
                "What happened: A pedal map is malformed ({msg}).\nLikely causes: Hand-edited CSV or inline table with unsorted or duplicate raw values.\nHow to fix: Keep the raw column strictly increasing with at least two rows."
            ),
            ConfigError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See README for a sample."
            ),
        };
    }

    if let Some(ve) = err.downcast_ref::<VcuError>() {
        if matches!(ve, VcuError::Timeout) {
            return "What happened: The CAN receive path went silent.\nLikely causes: Transceiver unpowered, bus unterminated, or wrong bitrate.\nHow to fix: Check wiring and termination, and the configured bitrate on both ends.".to_string();
        }
        if let VcuError::Hardware(msg) = ve {
            return format!(
                "What happened: An input device failed ({msg}).\nLikely causes: ADC wiring fault or a dead sensor supply rail.\nHow to fix: Check the pedal and brake sensor connectors and supplies."
            );
        }
        return format!(
            "What happened: {ve}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
        );
    }

    // String-based heuristics for errors coming from init or config.
    // Context wrappers hide the root cause, so scan the whole chain.
    let msg = err
        .chain()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(": ");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("calibration csv must have headers") {
        return "Invalid headers in calibration CSV. Expected 'raw,torque'.".to_string();
    }

    if lower.contains("strictly increasing") {
        return "What happened: A pedal map's raw column is not strictly increasing.\nHow to fix: Sort the rows by raw value and remove duplicates.".to_string();
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

/// Stable exit codes: config problems return 2, runtime failures 3.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    use vcu_core::error::{ConfigError, VcuError};
    if err.downcast_ref::<ConfigError>().is_some() {
        return 2;
    }
    if err.downcast_ref::<VcuError>().is_some() {
        return 3;
    }
    1
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;
    let reason = if err.downcast_ref::<vcu_core::error::ConfigError>().is_some() {
        "Config"
    } else if err.downcast_ref::<vcu_core::error::VcuError>().is_some() {
        "Runtime"
    } else {
        "Error"
    };
    json!({ "reason": reason, "message": humanize(err) }).to_string()
}
