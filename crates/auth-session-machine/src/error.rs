use backend_auth_client::BackendError;
use serde::Serialize;
use solvibe_core::CoreError;
use thiserror::Error;
use wallet_connector::WalletError;

/// Errors reported by the auth session machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No wallet extension is installed
    #[error("Wallet unavailable: {0}")]
    WalletUnavailable(String),

    /// The installed extension failed to connect or sign, or reported a bad
    /// account. Trying again may work.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// The user declined a connect or sign prompt
    #[error("Rejected in the wallet: {0}")]
    UserRejected(String),

    /// Transport failure, timeout or an unreadable backend response
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with a non-2xx status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Verify rejected the challenge as expired or consumed more times
    /// than the machine is allowed to fetch a new one
    #[error("Challenge is no longer valid: {0}")]
    StaleChallenge(String),

    /// Profile input rejected locally; no state change happened
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    /// The operation is not legal in the current phase
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// A newer attempt (account switch, disconnect, logout) replaced the one
    /// this call was waiting on
    #[error("Authentication attempt was superseded")]
    Superseded,
}

/// Coarse classification of an [`AuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AuthErrorKind {
    WalletUnavailable,
    WalletError,
    UserRejected,
    NetworkError,
    ApiError { status: u16 },
    StaleChallenge,
    /// Corrupt persisted session. Treated as absent by the session store and
    /// only ever logged.
    MalformedSession,
    InvalidProfile,
    InvalidStateTransition,
    Superseded,
}

impl AuthError {
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            AuthError::WalletUnavailable(_) => AuthErrorKind::WalletUnavailable,
            AuthError::Wallet(_) => AuthErrorKind::WalletError,
            AuthError::UserRejected(_) => AuthErrorKind::UserRejected,
            AuthError::Network(_) => AuthErrorKind::NetworkError,
            AuthError::Api { status, .. } => AuthErrorKind::ApiError { status: *status },
            AuthError::StaleChallenge(_) => AuthErrorKind::StaleChallenge,
            AuthError::InvalidProfile(_) => AuthErrorKind::InvalidProfile,
            AuthError::InvalidStateTransition(_) => AuthErrorKind::InvalidStateTransition,
            AuthError::Superseded => AuthErrorKind::Superseded,
        }
    }

    /// Whether retrying the same step could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::Network(_) | AuthError::Wallet(_))
    }
}

impl From<WalletError> for AuthError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::UserRejected | WalletError::SigningRejected => {
                AuthError::UserRejected(err.to_string())
            }
            WalletError::WalletUnavailable => AuthError::WalletUnavailable(err.to_string()),
            WalletError::ConnectFailed(_)
            | WalletError::NotConnected
            | WalletError::SignFailed(_)
            | WalletError::InvalidPublicKey(_)
            | WalletError::KeyFile(_) => AuthError::Wallet(err.to_string()),
        }
    }
}

impl From<BackendError> for AuthError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Network(msg) => AuthError::Network(msg),
            BackendError::InvalidResponse(msg) => {
                AuthError::Network(format!("invalid backend response: {msg}"))
            }
            BackendError::Api { status, message } => AuthError::Api { status, message },
        }
    }
}

impl From<CoreError> for AuthError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidProfile(msg) => AuthError::InvalidProfile(msg),
            other => AuthError::InvalidProfile(other.to_string()),
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Why the machine is in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthFailure {
    pub error: AuthError,
    /// The failure happened after a profile was submitted; retry returns to
    /// the profile form instead of starting over.
    pub during_registration: bool,
}

impl AuthFailure {
    pub fn kind(&self) -> AuthErrorKind {
        self.error.kind()
    }

    pub fn message(&self) -> String {
        self.error.to_string()
    }
}
