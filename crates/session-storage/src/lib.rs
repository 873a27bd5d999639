//! Durable local state for SolVibe wallet auth.
//!
//! A small key/value [`SecureStorage`] trait with two backends:
//! - **FileStorage**: JSON object file under `~/.solvibe`, owner-only on unix
//! - **MemoryStorage**: process-local map for tests and ephemeral runs
//!
//! On top of it sit the typed stores the rest of the workspace uses:
//! [`SessionStore`] for the token, user and profile flag, and
//! [`WalletIntentStore`] for the wallet's "was connected" hint.

mod file;
mod keys;
mod memory;
mod session_store;
mod traits;
mod wallet_intent;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use session_store::SessionStore;
pub use traits::SecureStorage;
pub use wallet_intent::WalletIntentStore;

use solvibe_core::Paths;
use std::sync::Arc;
use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific storage error
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Key not found
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Encoding(err.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Create the default on-disk storage at `paths.storage_file()`.
pub fn create_storage(paths: &Paths) -> StorageResult<Arc<dyn SecureStorage>> {
    let storage = FileStorage::open(paths.storage_file())?;
    Ok(Arc::new(storage))
}
