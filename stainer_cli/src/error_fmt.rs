//! Human-readable error descriptions and structured JSON error formatting.

use stainer_core::{BuildError, FaultReason, StainerError, fault_reason};

use crate::cli::LAST_SAFETY;

pub fn fault_reason_name(r: FaultReason) -> &'static str {
    match r {
        FaultReason::BothLimitsPressed => "BothLimitsPressed",
        FaultReason::AlreadyPressed => "AlreadyPressed",
        FaultReason::NotPressed => "NotPressed",
        FaultReason::UnknownDirection(_) => "UnknownDirection",
        FaultReason::BoundaryReachedMidTransition => "BoundaryReachedMidTransition",
        FaultReason::WaitTimeout => "WaitTimeout",
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingIo => {
                "What happened: No I/O backend was provided to the machine.\nLikely causes: GPIO failed to initialize or was not wired into the builder.\nHow to fix: Ensure the GPIO backend opens and is passed via with_io(...).".to_string()
            }
            BuildError::MissingConfig => {
                "What happened: No machine configuration was provided.\nLikely causes: The config was not loaded or not passed to the builder.\nHow to fix: Pass the loaded config via with_config(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun `stainer check`."
            ),
        };
    }

    if let Some(reason) = fault_reason(err) {
        let context = format!("{err:#}");
        return match reason {
            FaultReason::BothLimitsPressed => format!(
                "What happened: Both limit switches of one axis read pressed ({context}).\nLikely causes: A stuck or shorted switch, or a strict rig tapped on both sides at once.\nHow to fix: Inspect the switches and wiring, then restart the machine."
            ),
            FaultReason::AlreadyPressed => format!(
                "What happened: A switch was already pressed when a press was awaited ({context}).\nLikely causes: The head is parked on a limit, or the switch is stuck.\nHow to fix: Free the switch, or set run.strictness = \"lenient\" for rigs that park on limits."
            ),
            FaultReason::NotPressed => format!(
                "What happened: A switch was released when a release was awaited ({context}).\nLikely causes: A very short tap or switch bounce.\nHow to fix: Check the switch, or raise timing.debounce_ms."
            ),
            FaultReason::UnknownDirection(code) => format!(
                "What happened: Unknown direction code {code}.\nLikely causes: A corrupted run plan.\nHow to fix: Use up, down, left or right in run.passes."
            ),
            FaultReason::BoundaryReachedMidTransition => format!(
                "What happened: The boundary limit tripped during a transition ({context}).\nLikely causes: stroke_gap does not divide the travel, or the head started off-position.\nHow to fix: Adjust axes.*.stroke_gap, or set run.strictness = \"lenient\"."
            ),
            FaultReason::WaitTimeout => format!(
                "What happened: A switch wait exceeded the watchdog ({context}).\nLikely causes: No operator input, a disconnected switch, or a stalled motor.\nHow to fix: Check the wiring and motors; raise safety.switch_wait_ms (0 disables the watchdog)."
            ),
        };
    }

    if let Some(se) = err.downcast_ref::<StainerError>() {
        return format!(
            "What happened: {se}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
        );
    }

    // String-based heuristics for errors coming from init or config
    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("no gpio backend") {
        return format!(
            "What happened: {err}.\nHow to fix: Build with `cargo build --features hardware` on the controller, or try the config with `stainer simulate`."
        );
    }

    if lower.contains("open gpio") || lower.contains("pulse counter") {
        return "What happened: Failed to initialize GPIO pins.\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] and [axes] values in the config; ensure the process may access /dev/gpiomem.".to_string();
    }

    if lower.contains("parse config") || lower.contains("parse scenario") {
        return format!(
            "What happened: The TOML could not be parsed.\nDetails: {msg}\nHow to fix: Fix the reported key or value and rerun."
        );
    }

    if lower.contains("invalid config") || lower.contains("invalid scenario") {
        return format!(
            "What happened: Invalid configuration ({msg}).\nHow to fix: Edit the TOML and try again."
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

/// Map fault reasons (if present) to stable exit codes; other errors return 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match fault_reason(err) {
        Some(FaultReason::BothLimitsPressed) => 3,
        Some(FaultReason::AlreadyPressed) => 4,
        Some(FaultReason::NotPressed) => 5,
        Some(FaultReason::UnknownDirection(_)) => 6,
        Some(FaultReason::BoundaryReachedMidTransition) => 7,
        Some(FaultReason::WaitTimeout) => 8,
        None => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    if let Some(reason) = fault_reason(err) {
        let msg = humanize(err);
        let name = fault_reason_name(reason);
        let details = match reason {
            FaultReason::WaitTimeout => LAST_SAFETY
                .get()
                .map(|s| json!({ "switch_wait_ms": s.switch_wait_ms })),
            FaultReason::UnknownDirection(code) => Some(json!({ "code": code })),
            _ => None,
        };
        let obj = if let Some(d) = details {
            json!({ "reason": name, "details": d, "message": msg })
        } else {
            json!({ "reason": name, "message": msg })
        };
        return obj.to_string();
    }

    // Generic error JSON
    json!({ "reason": "Error", "message": humanize(err) }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;
    use stainer_core::error::fault;

    #[test]
    fn fault_codes_survive_context() {
        let err = Err::<(), _>(fault(FaultReason::WaitTimeout))
            .wrap_err("waiting for left press")
            .wrap_err("homing left")
            .unwrap_err();
        assert_eq!(exit_code_for_error(&err), 8);
        assert!(humanize(&err).contains("watchdog"));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "WaitTimeout");
    }

    #[test]
    fn build_errors_are_explained() {
        let err = eyre::Report::new(BuildError::InvalidConfig("spray min must be <= max".into()));
        assert_eq!(exit_code_for_error(&err), 1);
        assert!(humanize(&err).contains("Invalid configuration (spray min must be <= max)"));
    }
}
