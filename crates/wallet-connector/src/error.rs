use thiserror::Error;

/// Errors surfaced by [`crate::WalletConnector`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("No wallet extension is installed")]
    WalletUnavailable,

    #[error("Wallet connection was rejected by the user")]
    UserRejected,

    #[error("Wallet connection failed: {0}")]
    ConnectFailed(String),

    #[error("Message signing was rejected by the user")]
    SigningRejected,

    #[error("Wallet is not connected")]
    NotConnected,

    #[error("Message signing failed: {0}")]
    SignFailed(String),

    #[error("Wallet reported an invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Wallet key file error: {0}")]
    KeyFile(String),
}

pub type WalletResult<T> = Result<T, WalletError>;
