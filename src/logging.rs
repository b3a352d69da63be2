use flexi_logger::{FlexiLoggerError, Logger, LoggerHandle};

/// Starts the stderr logger. `RUST_LOG` takes precedence over `level`.
///
/// The returned handle must be kept alive for the lifetime of the process.
pub fn init_logging(level: &str) -> Result<LoggerHandle, FlexiLoggerError> {
    let handle = Logger::try_with_env_or_str(normalize_level(level))?
        .log_to_stderr()
        .format(flexi_logger::detailed_format)
        .start()?;

    log::info!(
        "[logging] started level={} version={}",
        normalize_level(level),
        env!("CARGO_PKG_VERSION")
    );

    Ok(handle)
}

/// Unknown level names fall back to `info`; `none` silences the service.
fn normalize_level(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" => "error",
        "none" | "off" => "off",
        _ => "info",
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_level;

    #[test]
    fn level_names_are_normalized() {
        assert_eq!(normalize_level("DEBUG"), "debug");
        assert_eq!(normalize_level(" warning "), "warn");
        assert_eq!(normalize_level("none"), "off");
        assert_eq!(normalize_level("verbose"), "info");
    }
}
