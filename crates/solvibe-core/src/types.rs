//! Domain values shared by the wallet connector, the backend client and the
//! auth machine.
//!
//! Wire names are camelCase to match the backend's JSON.

use crate::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Base58-encoded wallet public key.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    pub fn parse(raw: impl Into<String>) -> CoreResult<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(CoreError::InvalidAddress("empty address".to_string()));
        }
        bs58::decode(&raw)
            .into_vec()
            .map_err(|e| CoreError::InvalidAddress(format!("{raw}: {e}")))?;
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for WalletAddress {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WalletAddress({})", self.0)
    }
}

/// Base58 encoding of the raw signature bytes returned by the wallet.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(bs58::encode(bytes).into_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({} chars)", self.0.len())
    }
}

/// A server-issued message for one address, consumed by exactly one verify.
///
/// Deliberately not `Clone`: the only way to use it is
/// [`Challenge::into_verify_request`], which moves it.
#[derive(Debug, PartialEq, Eq)]
pub struct Challenge {
    wallet_address: WalletAddress,
    message: String,
}

impl Challenge {
    pub fn new(wallet_address: WalletAddress, message: impl Into<String>) -> Self {
        Self {
            wallet_address,
            message: message.into(),
        }
    }

    pub fn wallet_address(&self) -> &WalletAddress {
        &self.wallet_address
    }

    /// Exact bytes the wallet must sign.
    pub fn message_bytes(&self) -> &[u8] {
        self.message.as_bytes()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn into_verify_request(self, signature: Signature) -> VerifyRequest {
        VerifyRequest {
            wallet_address: self.wallet_address,
            message: self.message,
            signature,
        }
    }
}

/// Body of `POST /auth/verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub wallet_address: WalletAddress,
    pub message: String,
    pub signature: Signature,
}

/// Backend user record.
///
/// Fields the client does not know about are kept in `extra` so the record
/// is stored and returned exactly as the backend sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub wallet_address: WalletAddress,
    pub username: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An authenticated user plus the bearer token issued by verify.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user: UserProfile,
    pub token: String,
}

impl Session {
    pub fn new(user: UserProfile, token: impl Into<String>) -> Self {
        Self {
            user,
            token: token.into(),
        }
    }

    pub fn address(&self) -> &WalletAddress {
        &self.user.wallet_address
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Registration input collected from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFields {
    pub username: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl ProfileFields {
    pub fn new(username: impl Into<String>, name: impl Into<String>, bio: Option<String>) -> Self {
        Self {
            username: username.into(),
            name: name.into(),
            bio,
        }
    }

    /// Trimmed copy, rejecting a blank username or name. A blank bio is dropped.
    pub fn normalized(&self) -> CoreResult<Self> {
        Ok(Self {
            username: required("username", &self.username)?,
            name: required("name", &self.name)?,
            bio: optional(self.bio.as_deref()),
        })
    }
}

/// Narrow local edit of an authenticated user's profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `Some("")` clears the bio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.name.is_none() && self.bio.is_none()
    }

    /// Merge into `user`. Nothing is written unless every field validates.
    pub fn apply_to(&self, user: &mut UserProfile) -> CoreResult<()> {
        let username = self
            .username
            .as_deref()
            .map(|v| required("username", v))
            .transpose()?;
        let name = self
            .name
            .as_deref()
            .map(|v| required("name", v))
            .transpose()?;

        if let Some(username) = username {
            user.username = username;
        }
        if let Some(name) = name {
            user.name = name;
        }
        if let Some(bio) = &self.bio {
            user.bio = optional(Some(bio));
        }
        Ok(())
    }
}

fn required(field: &str, value: &str) -> CoreResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidProfile(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn addr(raw: &str) -> WalletAddress {
        WalletAddress::parse(raw).unwrap()
    }

    fn alice() -> UserProfile {
        serde_json::from_value(json!({
            "id": "u1",
            "walletAddress": "Addr1",
            "username": "alice",
            "name": "Alice",
        }))
        .unwrap()
    }

    #[test]
    fn address_rejects_empty_and_non_base58() {
        assert!(WalletAddress::parse("").is_err());
        // 0, O, I and l are outside the base58 alphabet
        assert!(WalletAddress::parse("0OIl").is_err());
        assert_eq!(addr("Addr1").as_str(), "Addr1");
    }

    #[test]
    fn address_deserialization_validates() {
        let bad: Result<WalletAddress, _> = serde_json::from_value(json!("not base58!"));
        assert!(bad.is_err());
        let good: WalletAddress = serde_json::from_value(json!("Addr2")).unwrap();
        assert_eq!(good, addr("Addr2"));
    }

    #[test]
    fn signature_is_base58_of_raw_bytes() {
        let sig = Signature::from_bytes(&[0, 0, 1]);
        assert_eq!(sig.as_str(), "112");
        let raw = bs58::decode("sig1").into_vec().unwrap();
        assert_eq!(Signature::from_bytes(&raw).as_str(), "sig1");
    }

    #[test]
    fn challenge_is_consumed_into_verify_request() {
        let challenge = Challenge::new(addr("Addr1"), "sign-this-1");
        assert_eq!(challenge.message_bytes(), b"sign-this-1");

        let raw = bs58::decode("sig1").into_vec().unwrap();
        let request = challenge.into_verify_request(Signature::from_bytes(&raw));
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "walletAddress": "Addr1", "message": "sign-this-1", "signature": "sig1" })
        );
    }

    #[test]
    fn user_profile_keeps_unknown_fields() {
        let raw = json!({
            "id": "u1",
            "walletAddress": "Addr1",
            "username": "alice",
            "name": "Alice",
            "profileImage": "https://img",
            "followers": 12,
        });
        let user: UserProfile = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(user.profile_image.as_deref(), Some("https://img"));
        assert_eq!(user.extra.get("followers"), Some(&json!(12)));
        assert_eq!(serde_json::to_value(&user).unwrap(), raw);
    }

    #[test]
    fn session_debug_hides_token() {
        let session = Session::new(alice(), "tok1");
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("tok1"));
        assert_eq!(session.address(), &addr("Addr1"));
    }

    #[test]
    fn profile_fields_are_trimmed_and_validated() {
        let fields = ProfileFields::new("  alice ", " Alice", Some("   ".to_string()));
        let normalized = fields.normalized().unwrap();
        assert_eq!(normalized, ProfileFields::new("alice", "Alice", None));

        assert!(ProfileFields::new(" ", "Alice", None).normalized().is_err());
        assert!(ProfileFields::new("alice", "", None).normalized().is_err());
    }

    #[test]
    fn profile_update_merges_only_given_fields() {
        let mut user = alice();
        user.bio = Some("old".to_string());

        let update = ProfileUpdate {
            name: Some(" Alice B ".to_string()),
            bio: Some(String::new()),
            ..Default::default()
        };
        update.apply_to(&mut user).unwrap();

        assert_eq!(user.username, "alice");
        assert_eq!(user.name, "Alice B");
        assert_eq!(user.bio, None);
    }

    #[test]
    fn profile_update_rejects_blank_username_without_partial_write() {
        let mut user = alice();
        let update = ProfileUpdate {
            username: Some("  ".to_string()),
            name: Some("Changed".to_string()),
            bio: None,
        };
        assert!(update.apply_to(&mut user).is_err());
        assert_eq!(user.name, "Alice");
    }
}
