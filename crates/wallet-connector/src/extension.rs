//! The capability interface an installed wallet extension provides.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

/// Options for [`WalletExtension::connect`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Succeed silently only if the user already approved this site;
    /// never show a prompt.
    pub only_if_trusted: bool,
}

/// Display encoding passed along with a sign request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MessageEncoding {
    #[default]
    Utf8,
}

/// Raw result of a sign request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedMessage {
    pub signature: Vec<u8>,
    /// Base58 public key of the signing account.
    pub public_key: String,
}

/// Events emitted by the extension, carrying raw base58 public keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionEvent {
    Connect(String),
    Disconnect,
    /// `None` means the user switched to an account not yet approved for
    /// this site, which leaves the site disconnected.
    AccountChanged(Option<String>),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtensionError {
    #[error("user rejected the request")]
    UserRejected,

    #[error("not connected")]
    NotConnected,

    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait WalletExtension: Send + Sync {
    /// Whether an extension is installed at all.
    fn is_present(&self) -> bool;

    fn is_connected(&self) -> bool;

    /// Base58 public key of the connected account.
    fn public_key(&self) -> Option<String>;

    /// Returns the connected account's base58 public key.
    async fn connect(&self, options: ConnectOptions) -> Result<String, ExtensionError>;

    async fn disconnect(&self) -> Result<(), ExtensionError>;

    async fn sign_message(
        &self,
        message: &[u8],
        encoding: MessageEncoding,
    ) -> Result<SignedMessage, ExtensionError>;

    fn subscribe(&self) -> broadcast::Receiver<ExtensionEvent>;
}

/// Stand-in for a host with no wallet extension installed.
pub struct AbsentExtension {
    events: broadcast::Sender<ExtensionEvent>,
}

impl AbsentExtension {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(1);
        Self { events }
    }
}

impl Default for AbsentExtension {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WalletExtension for AbsentExtension {
    fn is_present(&self) -> bool {
        false
    }

    fn is_connected(&self) -> bool {
        false
    }

    fn public_key(&self) -> Option<String> {
        None
    }

    async fn connect(&self, _options: ConnectOptions) -> Result<String, ExtensionError> {
        Err(ExtensionError::Other("no wallet extension installed".to_string()))
    }

    async fn disconnect(&self) -> Result<(), ExtensionError> {
        Ok(())
    }

    async fn sign_message(
        &self,
        _message: &[u8],
        _encoding: MessageEncoding,
    ) -> Result<SignedMessage, ExtensionError> {
        Err(ExtensionError::NotConnected)
    }

    fn subscribe(&self) -> broadcast::Receiver<ExtensionEvent> {
        self.events.subscribe()
    }
}
