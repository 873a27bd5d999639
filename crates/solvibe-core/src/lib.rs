//! Shared types, configuration, and utilities for SolVibe wallet auth.

mod config;
mod error;
mod logging;
mod paths;
pub mod types;

pub use config::{
    compile_time_api_url, Config, DEFAULT_API_URL, DEFAULT_MAX_CHALLENGE_REFRESHES,
    DEFAULT_WALLET_INSTALL_URL,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging_for_service, parse_level};
pub use paths::Paths;
pub use types::{
    Challenge, ProfileFields, ProfileUpdate, Session, Signature, UserProfile, VerifyRequest,
    WalletAddress,
};
