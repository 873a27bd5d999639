//! # Observability
//!
//! Structured logging for the SolVibe auth workspace.
//!
//! Library crates only emit `tracing` events. The binary installs the
//! subscriber once through [`init_with_config`]; a second call is a no-op.
//!
//! Every line lands as JSONL in `~/.solvibe/logs/dev.jsonl` (or
//! [`LogConfig::log_path`]):
//!
//! ```text
//! tail -f ~/.solvibe/logs/dev.jsonl | jq 'select(.wallet_address == "Addr1")'
//! ```
//!
//! Field values go through [`redact`] first. Session tokens, wallet
//! signatures and key material are replaced before anything is written.

#[cfg(feature = "dev")]
mod dev;

mod json_layer;
pub mod redact;

use std::path::PathBuf;

pub use json_layer::LogEntry;

/// Where and how much to log.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Written into every line as `service` (e.g. "solvibe-cli").
    pub service_name: String,
    /// Filter used when `RUST_LOG` is unset.
    pub default_level: String,
    /// JSONL destination. `None` means `~/.solvibe/logs/dev.jsonl`.
    pub log_path: Option<PathBuf>,
    /// Mirror events to stderr in compact text form.
    pub also_stderr: bool,
    pub redact_secrets: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "solvibe".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
            redact_secrets: true,
        }
    }
}

/// Install the global subscriber described by `config`.
pub fn init_with_config(config: LogConfig) {
    #[cfg(feature = "dev")]
    dev::init_dev_subscriber(&config);

    #[cfg(not(feature = "dev"))]
    {
        use tracing_subscriber::util::SubscriberInitExt;
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.default_level));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .compact()
            .finish()
            .try_init();
    }
}
