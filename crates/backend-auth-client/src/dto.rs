//! Wire shapes of the auth endpoints.

use serde::{Deserialize, Serialize};
use solvibe_core::{ProfileFields, UserProfile, WalletAddress};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WalletAddressRequest<'a> {
    pub wallet_address: &'a WalletAddress,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CheckWalletResponse {
    pub exists: bool,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest<'a> {
    pub wallet_address: &'a WalletAddress,
    pub username: &'a str,
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<&'a str>,
}

impl<'a> RegisterRequest<'a> {
    pub fn new(wallet_address: &'a WalletAddress, fields: &'a ProfileFields) -> Self {
        Self {
            wallet_address,
            username: &fields.username,
            name: &fields.name,
            bio: fields.bio.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RequestSignatureResponse {
    pub message_to_sign: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VerifyResponse {
    pub access_token: String,
    pub user: UserProfile,
}

/// Validation errors arrive as a list, everything else as one string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ApiMessage {
    One(String),
    Many(Vec<String>),
}

/// Body of any non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub message: Option<ApiMessage>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiErrorBody {
    /// Human-readable message: list entries joined with ", ", falling back
    /// to a generic status line.
    pub fn display_message(&self, status: u16) -> String {
        let message = match &self.message {
            Some(ApiMessage::One(m)) => m.clone(),
            Some(ApiMessage::Many(items)) => items.join(", "),
            None => String::new(),
        };
        if message.is_empty() {
            format!("API request failed with status {status}")
        } else {
            message
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_request_omits_missing_bio() {
        let addr = WalletAddress::parse("Addr1").unwrap();
        let fields = ProfileFields::new("alice", "Alice", None);

        let body = serde_json::to_value(RegisterRequest::new(&addr, &fields)).unwrap();
        assert_eq!(
            body,
            json!({ "walletAddress": "Addr1", "username": "alice", "name": "Alice" })
        );
    }

    #[test]
    fn test_error_message_list_is_joined() {
        let body: ApiErrorBody = serde_json::from_value(json!({
            "statusCode": 400,
            "message": ["username must be unique", "name is too long"],
            "error": "Bad Request",
        }))
        .unwrap();
        assert_eq!(
            body.display_message(400),
            "username must be unique, name is too long"
        );
    }

    #[test]
    fn test_error_without_message_uses_status() {
        let body: ApiErrorBody = serde_json::from_value(json!({ "statusCode": 502 })).unwrap();
        assert_eq!(body.display_message(502), "API request failed with status 502");
    }

    #[test]
    fn test_check_wallet_without_user() {
        let resp: CheckWalletResponse = serde_json::from_value(json!({ "exists": false })).unwrap();
        assert!(!resp.exists);
        assert!(resp.user.is_none());
    }
}
