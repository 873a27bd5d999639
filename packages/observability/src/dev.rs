//! File-backed subscriber: JSONL to disk, optionally mirrored to stderr.
//!
//! Several `solvibe` invocations may run at once, so the file is opened in
//! append mode and flushed after every line.

use crate::json_layer::JsonLayer;
use crate::LogConfig;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

fn default_log_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".solvibe")
        .join("logs")
        .join("dev.jsonl")
}

/// Shared append handle to the log file.
#[derive(Clone)]
pub struct AppendLog {
    file: Arc<Mutex<BufWriter<File>>>,
}

impl AppendLog {
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Arc::new(Mutex::new(BufWriter::new(file))),
        })
    }
}

impl Write for AppendLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = self.file.lock();
        let written = file.write(buf)?;
        file.flush()?;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.lock().flush()
    }
}

impl<'a> MakeWriter<'a> for AppendLog {
    type Writer = AppendLog;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn level_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the JSONL file layer plus the optional stderr layer.
///
/// An unopenable log file only drops the file layer.
pub fn init_dev_subscriber(config: &LogConfig) {
    let log_path = config.log_path.clone().unwrap_or_else(default_log_path);

    let file_layer = match AppendLog::open(&log_path) {
        Ok(log) => Some(
            JsonLayer::new(config.service_name.clone(), log, config.redact_secrets)
                .with_filter(level_filter(&config.default_level)),
        ),
        Err(e) => {
            eprintln!("solvibe: cannot open log file {}: {e}", log_path.display());
            None
        }
    };

    let stderr_layer = config.also_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(io::stderr)
            .with_filter(level_filter(&config.default_level))
    });

    let installed = tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(
            log_path = %log_path.display(),
            service = %config.service_name,
            "Logging initialized"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_missing_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("cli.jsonl");

        let mut log = AppendLog::open(&path).unwrap();
        log.write_all(b"{\"message\":\"hi\"}\n").unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "{\"message\":\"hi\"}\n"
        );
    }

    #[test]
    fn test_lines_from_two_handles_append() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shared.jsonl");

        AppendLog::open(&path).unwrap().write_all(b"one\n").unwrap();
        AppendLog::open(&path).unwrap().write_all(b"two\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }
}
