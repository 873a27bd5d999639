//! Best-effort "wallet was connected" hint used for silent reconnect.

use crate::{SecureStorage, StorageKeys};
use solvibe_core::WalletAddress;
use std::sync::Arc;
use tracing::warn;

/// Remembers that the user connected a wallet so the next start can try a
/// trusted-only reconnect.
///
/// This is a hint, not state: the extension remains the only authority on
/// whether a wallet is actually connected. Write failures are logged and
/// otherwise ignored.
#[derive(Clone)]
pub struct WalletIntentStore {
    storage: Arc<dyn SecureStorage>,
}

impl WalletIntentStore {
    pub fn new(storage: Arc<dyn SecureStorage>) -> Self {
        Self { storage }
    }

    pub fn remember(&self, address: &WalletAddress) {
        let result = self
            .storage
            .set(StorageKeys::WALLET_CONNECTED, "true")
            .and_then(|_| self.storage.set(StorageKeys::WALLET_ADDRESS, address.as_str()));
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist wallet intent");
        }
    }

    pub fn forget(&self) {
        if let Err(e) = self
            .storage
            .delete_all(&[StorageKeys::WALLET_CONNECTED, StorageKeys::WALLET_ADDRESS])
        {
            warn!(error = %e, "Failed to clear wallet intent");
        }
    }

    /// Whether a silent reconnect should be attempted.
    pub fn is_set(&self) -> bool {
        matches!(
            self.storage.get(StorageKeys::WALLET_CONNECTED),
            Ok(Some(ref value)) if value == "true"
        )
    }

    /// Address recorded with the intent, if it is still a valid address.
    pub fn last_address(&self) -> Option<WalletAddress> {
        if !self.is_set() {
            return None;
        }
        self.storage
            .get(StorageKeys::WALLET_ADDRESS)
            .ok()
            .flatten()
            .and_then(|raw| WalletAddress::parse(raw).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;

    #[test]
    fn test_remember_and_forget() {
        let store = WalletIntentStore::new(Arc::new(MemoryStorage::new()));
        assert!(!store.is_set());
        assert_eq!(store.last_address(), None);

        let addr = WalletAddress::parse("Addr1").unwrap();
        store.remember(&addr);
        assert!(store.is_set());
        assert_eq!(store.last_address(), Some(addr));

        store.forget();
        store.forget();
        assert!(!store.is_set());
        assert_eq!(store.last_address(), None);
    }

    #[test]
    fn test_intent_does_not_touch_session_keys() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(StorageKeys::AUTH_TOKEN, "tok1").unwrap();
        let store = WalletIntentStore::new(storage.clone());

        store.remember(&WalletAddress::parse("Addr1").unwrap());
        store.forget();

        assert!(storage.has(StorageKeys::AUTH_TOKEN).unwrap());
    }
}
