//! Software wallet backed by a local ed25519 key.
//!
//! Behaves like a browser wallet extension from the connector's point of
//! view: it has a connected flag, signs raw message bytes, and announces
//! connect/disconnect through the same event channel. Useful on hosts with
//! no browser and in tests.

use crate::error::{WalletError, WalletResult};
use crate::extension::{
    ConnectOptions, ExtensionError, ExtensionEvent, MessageEncoding, SignedMessage,
    WalletExtension,
};
use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use parking_lot::Mutex;
use std::path::Path;
use tokio::sync::broadcast;
use tracing::{debug, info};

const EVENT_CHANNEL_CAPACITY: usize = 32;

#[derive(Default)]
struct KeypairState {
    connected: bool,
    reject_connect: bool,
    reject_sign: bool,
}

pub struct KeypairWallet {
    signing_key: SigningKey,
    public_key: String,
    state: Mutex<KeypairState>,
    events: broadcast::Sender<ExtensionEvent>,
}

impl KeypairWallet {
    pub fn from_secret(secret: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&secret);
        let public_key = bs58::encode(signing_key.verifying_key().as_bytes()).into_string();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            signing_key,
            public_key,
            state: Mutex::new(KeypairState::default()),
            events,
        }
    }

    pub fn generate() -> Self {
        Self::from_secret(rand::random())
    }

    /// Parse a base58-encoded 32-byte secret key.
    pub fn from_secret_base58(encoded: &str) -> WalletResult<Self> {
        let bytes = bs58::decode(encoded.trim())
            .into_vec()
            .map_err(|e| WalletError::KeyFile(format!("secret is not base58: {e}")))?;
        let secret: [u8; 32] = bytes
            .try_into()
            .map_err(|_| WalletError::KeyFile("secret must be 32 bytes".to_string()))?;
        Ok(Self::from_secret(secret))
    }

    pub fn secret_base58(&self) -> String {
        bs58::encode(self.signing_key.to_bytes()).into_string()
    }

    /// Load the key file at `path`, creating it with a fresh key if missing.
    pub fn load_or_create(path: &Path) -> WalletResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let wallet = Self::from_secret_base58(&content)?;
                debug!(path = %path.display(), public_key = %wallet.public_key, "Loaded wallet key");
                Ok(wallet)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let wallet = Self::generate();
                wallet.save(path)?;
                info!(path = %path.display(), public_key = %wallet.public_key, "Created wallet key");
                Ok(wallet)
            }
            Err(e) => Err(WalletError::KeyFile(e.to_string())),
        }
    }

    /// Write the secret key to `path`, owner-only on unix.
    pub fn save(&self, path: &Path) -> WalletResult<()> {
        let write = || -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, self.secret_base58())?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
            }
            Ok(())
        };
        write().map_err(|e| WalletError::KeyFile(e.to_string()))
    }

    pub fn public_key_base58(&self) -> &str {
        &self.public_key
    }

    /// Make the next connect prompts fail as if the user declined.
    pub fn set_reject_connect(&self, reject: bool) {
        self.state.lock().reject_connect = reject;
    }

    /// Make the next sign prompts fail as if the user declined.
    pub fn set_reject_sign(&self, reject: bool) {
        self.state.lock().reject_sign = reject;
    }

    fn emit(&self, event: ExtensionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl WalletExtension for KeypairWallet {
    fn is_present(&self) -> bool {
        true
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    fn public_key(&self) -> Option<String> {
        self.is_connected().then(|| self.public_key.clone())
    }

    async fn connect(&self, options: ConnectOptions) -> Result<String, ExtensionError> {
        {
            let mut state = self.state.lock();
            if state.reject_connect && !options.only_if_trusted {
                return Err(ExtensionError::UserRejected);
            }
            if state.connected {
                return Ok(self.public_key.clone());
            }
            state.connected = true;
        }
        self.emit(ExtensionEvent::Connect(self.public_key.clone()));
        Ok(self.public_key.clone())
    }

    async fn disconnect(&self) -> Result<(), ExtensionError> {
        let was_connected = std::mem::replace(&mut self.state.lock().connected, false);
        if was_connected {
            self.emit(ExtensionEvent::Disconnect);
        }
        Ok(())
    }

    async fn sign_message(
        &self,
        message: &[u8],
        _encoding: MessageEncoding,
    ) -> Result<SignedMessage, ExtensionError> {
        {
            let state = self.state.lock();
            if !state.connected {
                return Err(ExtensionError::NotConnected);
            }
            if state.reject_sign {
                return Err(ExtensionError::UserRejected);
            }
        }
        let signature = self.signing_key.sign(message);
        Ok(SignedMessage {
            signature: signature.to_bytes().to_vec(),
            public_key: self.public_key.clone(),
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<ExtensionEvent> {
        self.events.subscribe()
    }
}
