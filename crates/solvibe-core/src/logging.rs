//! Logging initialization.
//!
//! Thin wrapper over the observability crate. Every SolVibe process writes
//! structured JSONL to `~/.solvibe/logs/dev.jsonl`.

use std::path::PathBuf;

/// Initialize logging for one SolVibe process.
///
/// ```ignore
/// init_logging_for_service("solvibe-cli", "info", None, false);
/// tracing::info!("ready");
/// ```
///
/// `also_stderr` mirrors every line to stderr in compact form, which the CLI
/// enables for `--log-level debug` and above.
pub fn init_logging_for_service(
    service_name: &str,
    level: &str,
    log_path: Option<PathBuf>,
    also_stderr: bool,
) {
    observability::init_with_config(observability::LogConfig {
        service_name: service_name.into(),
        default_level: level.into(),
        log_path,
        also_stderr,
        redact_secrets: true,
    });
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
