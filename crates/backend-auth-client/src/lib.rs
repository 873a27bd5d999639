//! Typed client for the SolVibe backend's wallet auth endpoints.
//!
//! [`BackendAuthClient`] is the contract the auth machine depends on;
//! [`HttpBackendClient`] is the reqwest implementation of it.

mod dto;
mod error;
mod http;

pub use dto::{ApiErrorBody, ApiMessage, CheckWalletResponse, RegisterRequest};
pub use error::{BackendError, BackendResult};
pub use http::HttpBackendClient;

use async_trait::async_trait;
use solvibe_core::{Challenge, ProfileFields, Session, VerifyRequest, WalletAddress};

/// The four remote operations of the wallet handshake.
#[async_trait]
pub trait BackendAuthClient: Send + Sync {
    /// `POST /auth/check-wallet`
    async fn check_wallet(&self, address: &WalletAddress) -> BackendResult<CheckWalletResponse>;

    /// `POST /auth/register`. The backend answers with the first challenge.
    async fn register(
        &self,
        address: &WalletAddress,
        fields: &ProfileFields,
    ) -> BackendResult<Challenge>;

    /// `POST /auth/request-signature`
    async fn request_signature(&self, address: &WalletAddress) -> BackendResult<Challenge>;

    /// `POST /auth/verify`
    async fn verify(&self, request: VerifyRequest) -> BackendResult<Session>;
}
