//! Persistence mirror for the authenticated session.

use crate::{SecureStorage, StorageKeys, StorageResult};
use solvibe_core::{Session, UserProfile};
use std::sync::Arc;
use tracing::{debug, warn};

/// Reads and writes the session token, the serialized user and the
/// profile-completed flag.
///
/// The auth machine owns the live session; this store only mirrors it and is
/// read back once at startup. [`SessionStore::load`] therefore never fails:
/// anything missing, unreadable or inconsistent is reported as no session.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn SecureStorage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SecureStorage>) -> Self {
        Self { storage }
    }

    pub fn load(&self) -> Option<Session> {
        let token = match self.storage.get(StorageKeys::AUTH_TOKEN) {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read stored auth token");
                return None;
            }
        };
        let user = match self.storage.get(StorageKeys::AUTH_USER) {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "Failed to read stored user");
                return None;
            }
        };

        match (token, user) {
            (None, None) => None,
            (Some(token), Some(user)) if !token.is_empty() => {
                match serde_json::from_str::<UserProfile>(&user) {
                    Ok(user) => {
                        debug!(wallet_address = %user.wallet_address, "Loaded stored session");
                        Some(Session::new(user, token))
                    }
                    Err(e) => {
                        self.discard_malformed(&format!("stored user is not valid JSON: {e}"));
                        None
                    }
                }
            }
            _ => {
                self.discard_malformed("token and user are not stored together");
                None
            }
        }
    }

    pub fn save(&self, session: &Session) -> StorageResult<()> {
        let user = serde_json::to_string(&session.user)?;
        self.storage.set(StorageKeys::AUTH_TOKEN, &session.token)?;
        self.storage.set(StorageKeys::AUTH_USER, &user)?;
        debug!(wallet_address = %session.address(), "Session persisted");
        Ok(())
    }

    /// Remove the token, the user and the profile flag together.
    pub fn clear(&self) -> StorageResult<()> {
        self.storage.delete_all(&StorageKeys::SESSION)?;
        debug!("Stored session cleared");
        Ok(())
    }

    /// Cached "profile completed" flag. Unreadable values count as false.
    pub fn profile_completed(&self) -> bool {
        match self.storage.get(StorageKeys::PROFILE_COMPLETED) {
            Ok(Some(value)) => value == "true",
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "Failed to read profile flag");
                false
            }
        }
    }

    pub fn set_profile_completed(&self, completed: bool) -> StorageResult<()> {
        if completed {
            self.storage.set(StorageKeys::PROFILE_COMPLETED, "true")
        } else {
            self.storage.delete(StorageKeys::PROFILE_COMPLETED).map(|_| ())
        }
    }

    fn discard_malformed(&self, reason: &str) {
        warn!(reason = %reason, "Malformed stored session, treating as absent");
        if let Err(e) = self.clear() {
            warn!(error = %e, "Failed to clear malformed session");
        }
    }
}
