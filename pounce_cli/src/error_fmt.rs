//! Human-readable error descriptions and structured JSON error formatting.

use crate::cli::LAST_MANEUVER;
use pounce_core::error::BuildError;
use pounce_core::{AbortReason, ManeuverError};

pub fn abort_reason_name(r: &AbortReason) -> &'static str {
    match r {
        AbortReason::Interrupted => "Interrupted",
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes
/// and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingServo => {
                "What happened: No servo was provided to the maneuver engine.\nLikely causes: The servo failed to initialize or was not wired into the builder.\nHow to fix: Ensure a servo is created successfully and passed via with_servo(...).".to_string()
            }
            BuildError::MissingPhaseCfg => {
                "What happened: No phase configuration was provided to the maneuver engine.\nLikely causes: The config file was not loaded or the builder was not configured.\nHow to fix: Pass a config with a [maneuver] section, or set the phase parameters explicitly.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range phase parameters in the TOML or a CLI override.\nHow to fix: Edit the [maneuver] section or the offending flag, then rerun. See etc/pounce.toml for a sample."
            ),
        };
    }

    if let Some(me) = err.downcast_ref::<ManeuverError>() {
        // Specific domain cases first
        if matches!(me, ManeuverError::Timeout) {
            return "What happened: A servo command timed out.\nLikely causes: Controller unpowered, transport disconnected, or timeouts.command_ms too low.\nHow to fix: Check power and the bus link, or raise timeouts.command_ms (--timeout-ms).".to_string();
        }
        if let ManeuverError::Abort(reason) = me {
            return match reason {
                AbortReason::Interrupted => "What happened: The run was interrupted before the termination deadline.\nLikely causes: Ctrl-C or an external shutdown request.\nHow to fix: Nothing is broken; the servo was stopped and partial telemetry was flushed. Start a new run when ready.".to_string(),
            };
        }
        if let ManeuverError::ServoFault(msg) = me {
            return format!(
                "What happened: The controller latched a fault ({msg}).\nLikely causes: Overcurrent, a position limit, or a power brownout during the push.\nHow to fix: Check the mechanics and power, then rerun; the next run clears the fault on begin."
            );
        }
        // Fallback to generic for other domain errors
        return format!(
            "What happened: {me}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
        );
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("reading config") {
        return "What happened: The config file could not be read.\nLikely causes: Wrong --config path or missing file.\nHow to fix: Pass --config <FILE> pointing at a pounce TOML config.".to_string();
    }

    if lower.contains("parsing config") {
        return format!(
            "What happened: The config file is not valid TOML for this schema ({msg}).\nLikely causes: A typo, a missing [maneuver] field, or a wrong value type.\nHow to fix: Compare against etc/pounce.toml and fix the named line."
        );
    }

    if lower.contains("maneuver.")
        || lower.contains("timeouts.")
        || lower.contains("telemetry.")
        || lower.contains("sim.")
    {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: Out-of-range or missing values in the TOML.\nHow to fix: Edit the named field and try again."
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

/// Map domain errors to stable exit codes; everything else returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(me) = err.downcast_ref::<ManeuverError>() {
        return match me {
            ManeuverError::Abort(AbortReason::Interrupted) => 2,
            ManeuverError::Timeout => 3,
            ManeuverError::ServoFault(_) => 4,
            _ => 1,
        };
    }
    1
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    if let Some(me) = err.downcast_ref::<ManeuverError>() {
        let msg = humanize(err);
        let obj = match me {
            ManeuverError::Abort(reason) => {
                match LAST_MANEUVER.get().map(|m| {
                    json!({
                        "t_begin": m.t_begin,
                        "t_reset": m.t_reset,
                        "pd_begin": m.pd_begin,
                        "pd_target": m.pd_target,
                        "termination_time": m.termination_time,
                    })
                }) {
                    Some(d) => {
                        json!({ "reason": abort_reason_name(reason), "details": d, "message": msg })
                    }
                    None => json!({ "reason": abort_reason_name(reason), "message": msg }),
                }
            }
            ManeuverError::Timeout => {
                match LAST_MANEUVER.get().map(|m| json!({ "command_ms": m.command_ms })) {
                    Some(d) => json!({ "reason": "Timeout", "details": d, "message": msg }),
                    None => json!({ "reason": "Timeout", "message": msg }),
                }
            }
            ManeuverError::ServoFault(_) => json!({ "reason": "ServoFault", "message": msg }),
            _ => json!({ "reason": "Error", "message": msg }),
        };
        return obj.to_string();
    }

    // Generic error JSON
    json!({ "reason": "Error", "message": humanize(err) }).to_string()
}
