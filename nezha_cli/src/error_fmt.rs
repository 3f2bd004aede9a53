//! Human-readable error descriptions and structured JSON error formatting.

use nezha_core::error::{BuildError, NezhaError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingBus => {
                "What happened: No bus was provided to the motor hub.\nLikely causes: The I2C bus failed to open or was not wired into the builder.\nHow to fix: Check the [bus] section and that the board is powered.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(ne) = err.downcast_ref::<NezhaError>() {
        return match ne {
            NezhaError::Transport(detail) => format!(
                "What happened: The board did not accept a frame ({detail}).\nLikely causes: Wrong I2C bus or address, loose wiring, or the board is unpowered.\nHow to fix: Check [bus].i2c_bus and [bus].address (default 0x10) and the cabling."
            ),
            NezhaError::ShortRead { expected, got } => format!(
                "What happened: The board answered with {got} of {expected} bytes.\nLikely causes: Bus noise or a firmware that does not support this read.\nHow to fix: Retry; if it persists, check the firmware version with `nezha version`."
            ),
            NezhaError::Config(detail) => format!(
                "What happened: Configuration is invalid ({detail}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file and try again."
            ),
        };
    }

    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 for bus faults, 4 for configuration, 1 otherwise.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(ne) = err.downcast_ref::<NezhaError>() {
        return match ne {
            NezhaError::Transport(_) | NezhaError::ShortRead { .. } => 3,
            NezhaError::Config(_) => 4,
        };
    }
    if let Some(BuildError::InvalidConfig(_)) = err.downcast_ref::<BuildError>() {
        return 4;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    match err.downcast_ref::<NezhaError>() {
        Some(NezhaError::Transport(_)) => "Transport",
        Some(NezhaError::ShortRead { .. }) => "ShortRead",
        Some(NezhaError::Config(_)) => "Config",
        None => match err.downcast_ref::<BuildError>() {
            Some(_) => "Build",
            None => "Error",
        },
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let mut obj = json!({
        "reason": reason_name(err),
        "message": humanize(err),
        "exit_code": exit_code_for_error(err),
    });
    if let Some(NezhaError::ShortRead { expected, got }) = err.downcast_ref::<NezhaError>() {
        obj["details"] = json!({ "expected": expected, "got": got });
    }
    obj.to_string()
}
