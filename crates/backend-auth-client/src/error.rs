use thiserror::Error;

/// Error type for backend calls.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Transport failure or timeout; the request may never have arrived.
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with a non-2xx status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A 2xx body that does not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

const STALE_CHALLENGE_MARKERS: [&str; 5] = [
    "expired",
    "already used",
    "consumed",
    "challenge not found",
    "nonce",
];

impl BackendError {
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a verify failure means the challenge itself is no longer
    /// valid, as opposed to a bad signature or an unknown wallet.
    ///
    /// 410 always counts. 400 and 401 count only when the message says so.
    pub fn is_stale_challenge(&self) -> bool {
        match self {
            BackendError::Api { status: 410, .. } => true,
            BackendError::Api {
                status: 400 | 401,
                message,
            } => {
                let lower = message.to_ascii_lowercase();
                STALE_CHALLENGE_MARKERS.iter().any(|m| lower.contains(m))
            }
            _ => false,
        }
    }

    /// Worth retrying without changing the request.
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::Network(_))
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::InvalidResponse(err.to_string())
        } else if err.is_timeout() {
            BackendError::Network(format!("request timed out: {err}"))
        } else {
            BackendError::Network(err.to_string())
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;
