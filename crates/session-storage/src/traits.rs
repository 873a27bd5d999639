//! Storage trait definitions.

use crate::StorageResult;

/// Trait for key/value storage backends
pub trait SecureStorage: Send + Sync {
    /// Store a value
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Retrieve a value
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Delete a value, returning whether it existed
    fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Check if a key exists
    fn has(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Delete several keys. Stops at the first backend error.
    fn delete_all(&self, keys: &[&str]) -> StorageResult<()> {
        for key in keys {
            self.delete(key)?;
        }
        Ok(())
    }
}
