//! reqwest implementation of [`BackendAuthClient`].

use crate::dto::{
    ApiErrorBody, CheckWalletResponse, RegisterRequest, RegisterResponse,
    RequestSignatureResponse, VerifyResponse, WalletAddressRequest,
};
use crate::error::{BackendError, BackendResult};
use crate::BackendAuthClient;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use solvibe_core::{Challenge, Config, ProfileFields, Session, VerifyRequest, WalletAddress};
use std::time::Duration;
use url::Url;

/// HTTP client for the auth endpoints.
///
/// Every request carries the client-level timeout; a timeout surfaces as
/// [`BackendError::Network`].
#[derive(Clone)]
pub struct HttpBackendClient {
    http_client: reqwest::Client,
    base_url: Url,
}

impl HttpBackendClient {
    pub fn new(base_url: Url, timeout: Duration) -> BackendResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: with_trailing_slash(base_url),
        })
    }

    pub fn from_config(config: &Config) -> BackendResult<Self> {
        let base_url = config
            .api_base_url()
            .map_err(|e| BackendError::Network(e.to_string()))?;
        Self::new(base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> BackendResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| BackendError::Network(format!("invalid endpoint {path}: {e}")))
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> BackendResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        tracing::debug!(url = %url, "POST backend");

        let response = self.http_client.post(url).json(body).send().await?;
        Self::handle_response(path, response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> BackendResult<T> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|err| err.display_message(status.as_u16()))
                .unwrap_or_else(|_| format!("API request failed with status {}", status.as_u16()));
            tracing::warn!(path, status = %status, message = %message, "Backend rejected request");
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(path, error = %e, body_len = body.len(), "Unexpected backend response shape");
            BackendError::InvalidResponse(format!("{path}: {e}"))
        })
    }

    /// `GET /profile` with the session's bearer token. The body is returned
    /// as-is.
    pub async fn fetch_profile(&self, token: &str) -> BackendResult<serde_json::Value> {
        let url = self.endpoint("profile")?;
        let response = self
            .http_client
            .get(url)
            .header("Authorization", format!("Bearer {}", token))
            .header("Accept", "application/json")
            .send()
            .await?;
        Self::handle_response("profile", response).await
    }
}

#[async_trait]
impl BackendAuthClient for HttpBackendClient {
    async fn check_wallet(&self, address: &WalletAddress) -> BackendResult<CheckWalletResponse> {
        let response: CheckWalletResponse = self
            .post_json(
                "auth/check-wallet",
                &WalletAddressRequest {
                    wallet_address: address,
                },
            )
            .await?;
        tracing::debug!(wallet_address = %address, exists = response.exists, "Checked wallet");
        Ok(response)
    }

    async fn register(
        &self,
        address: &WalletAddress,
        fields: &ProfileFields,
    ) -> BackendResult<Challenge> {
        let response: RegisterResponse = self
            .post_json("auth/register", &RegisterRequest::new(address, fields))
            .await?;
        tracing::info!(wallet_address = %address, username = %fields.username, "Registered wallet");
        Ok(Challenge::new(address.clone(), response.message))
    }

    async fn request_signature(&self, address: &WalletAddress) -> BackendResult<Challenge> {
        let response: RequestSignatureResponse = self
            .post_json(
                "auth/request-signature",
                &WalletAddressRequest {
                    wallet_address: address,
                },
            )
            .await?;
        Ok(Challenge::new(address.clone(), response.message_to_sign))
    }

    async fn verify(&self, request: VerifyRequest) -> BackendResult<Session> {
        let response: VerifyResponse = self.post_json("auth/verify", &request).await?;

        if response.user.wallet_address != request.wallet_address {
            return Err(BackendError::InvalidResponse(format!(
                "verify returned user for {} instead of {}",
                response.user.wallet_address, request.wallet_address
            )));
        }
        Ok(Session::new(response.user, response.access_token))
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
