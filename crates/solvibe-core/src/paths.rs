//! Where the client keeps its files.
//!
//! Everything lives under one directory, `~/.solvibe` unless a test or the
//! caller picks another root:
//!
//! ```text
//! ~/.solvibe/
//! ├── config.json      Config
//! ├── storage.json     session token, user, profile flag, wallet intent
//! ├── wallet.key       base58 ed25519 secret of the local wallet
//! └── logs/dev.jsonl   structured log
//! ```

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Paths {
    root: PathBuf,
}

impl Paths {
    /// Rooted at `~/.solvibe`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;
        Ok(Self::with_base_dir(home.join(".solvibe")))
    }

    pub fn with_base_dir(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    pub fn storage_file(&self) -> PathBuf {
        self.root.join("storage.json")
    }

    pub fn wallet_key_file(&self) -> PathBuf {
        self.root.join("wallet.key")
    }

    pub fn log_file(&self) -> PathBuf {
        self.root.join("logs").join("dev.jsonl")
    }

    /// Create the root and the log directory. Safe to repeat.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        if let Some(logs) = self.log_file().parent() {
            std::fs::create_dir_all(logs)?;
        }
        Ok(())
    }
}
