use crate::error::{WalletError, WalletResult};
use crate::events::{WalletEvent, WalletEvents};
use crate::extension::{ConnectOptions, ExtensionError, MessageEncoding, WalletExtension};
use crate::install::{BrowserInstallPrompt, InstallPrompt};
use session_storage::WalletIntentStore;
use solvibe_core::{Signature, WalletAddress, DEFAULT_WALLET_INSTALL_URL};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Typed wrapper over one wallet extension.
///
/// Also keeps the "was connected" intent in step with what the extension
/// reports, so a later start can attempt [`WalletConnector::restore`].
#[derive(Clone)]
pub struct WalletConnector {
    extension: Arc<dyn WalletExtension>,
    intent: WalletIntentStore,
    install_prompt: Arc<dyn InstallPrompt>,
    install_url: String,
}

impl WalletConnector {
    pub fn new(extension: Arc<dyn WalletExtension>, intent: WalletIntentStore) -> Self {
        Self {
            extension,
            intent,
            install_prompt: Arc::new(BrowserInstallPrompt),
            install_url: DEFAULT_WALLET_INSTALL_URL.to_string(),
        }
    }

    pub fn with_install_prompt(
        mut self,
        prompt: Arc<dyn InstallPrompt>,
        install_url: impl Into<String>,
    ) -> Self {
        self.install_prompt = prompt;
        self.install_url = install_url.into();
        self
    }

    pub fn is_available(&self) -> bool {
        self.extension.is_present()
    }

    pub fn is_connected(&self) -> bool {
        self.extension.is_present() && self.extension.is_connected()
    }

    /// Address of the currently connected account, as the extension reports it.
    pub fn current_address(&self) -> Option<WalletAddress> {
        if !self.is_connected() {
            return None;
        }
        self.extension
            .public_key()
            .and_then(|pk| WalletAddress::parse(pk).ok())
    }

    /// Prompt the user to connect.
    ///
    /// With no extension installed this opens the install page and fails
    /// with [`WalletError::WalletUnavailable`].
    pub async fn connect(&self) -> WalletResult<WalletAddress> {
        if !self.extension.is_present() {
            warn!("Wallet extension not found, prompting install");
            self.install_prompt.prompt_install(&self.install_url);
            return Err(WalletError::WalletUnavailable);
        }
        self.connect_with(ConnectOptions::default()).await
    }

    /// Reconnect without prompting; only succeeds for an already trusted site.
    pub async fn connect_trusted(&self) -> WalletResult<WalletAddress> {
        if !self.extension.is_present() {
            return Err(WalletError::WalletUnavailable);
        }
        self.connect_with(ConnectOptions {
            only_if_trusted: true,
        })
        .await
    }

    async fn connect_with(&self, options: ConnectOptions) -> WalletResult<WalletAddress> {
        let result = match self.extension.connect(options).await {
            Ok(pk) => WalletAddress::parse(pk).map_err(|e| WalletError::InvalidPublicKey(e.to_string())),
            Err(ExtensionError::UserRejected) => Err(WalletError::UserRejected),
            Err(e) => Err(WalletError::ConnectFailed(e.to_string())),
        };

        match &result {
            Ok(address) => {
                info!(wallet_address = %address, trusted_only = options.only_if_trusted, "Wallet connected");
                self.intent.remember(address);
            }
            Err(e) => {
                debug!(error = %e, trusted_only = options.only_if_trusted, "Wallet connect failed");
                self.intent.forget();
            }
        }
        result
    }

    /// Release the connection. Safe to call any number of times.
    pub async fn disconnect(&self) {
        self.intent.forget();
        if !self.is_connected() {
            debug!("Wallet already disconnected");
            return;
        }
        if let Err(e) = self.extension.disconnect().await {
            warn!(error = %e, "Wallet extension failed to disconnect");
        }
    }

    /// Ask the wallet to sign `message` and return the base58 signature.
    pub async fn sign_message(&self, message: &[u8]) -> WalletResult<Signature> {
        if !self.extension.is_present() {
            return Err(WalletError::WalletUnavailable);
        }
        if !self.extension.is_connected() {
            return Err(WalletError::NotConnected);
        }

        match self
            .extension
            .sign_message(message, MessageEncoding::Utf8)
            .await
        {
            Ok(signed) => Ok(Signature::from_bytes(&signed.signature)),
            Err(ExtensionError::UserRejected) => Err(WalletError::SigningRejected),
            Err(ExtensionError::NotConnected) => Err(WalletError::NotConnected),
            Err(ExtensionError::Other(msg)) => Err(WalletError::SignFailed(msg)),
        }
    }

    pub fn subscribe(&self) -> WalletEvents {
        WalletEvents::new(self.extension.subscribe())
    }

    /// Keep the reconnect intent in step with an observed event.
    pub fn record_event(&self, event: &WalletEvent) {
        match event.address() {
            Some(address) => self.intent.remember(address),
            None => self.intent.forget(),
        }
    }

    /// Silent reconnect on startup.
    ///
    /// Only attempted when the intent flag is set. Uses the extension's
    /// current account if it is already connected, otherwise a trusted-only
    /// connect. Any failure clears the intent.
    pub async fn restore(&self) -> Option<WalletAddress> {
        if !self.intent.is_set() {
            return None;
        }
        if !self.extension.is_present() {
            debug!("Skipping wallet restore, no extension");
            return None;
        }

        if let Some(address) = self.current_address() {
            debug!(wallet_address = %address, "Wallet still connected");
            self.intent.remember(&address);
            return Some(address);
        }

        match self.connect_trusted().await {
            Ok(address) => Some(address),
            Err(e) => {
                debug!(error = %e, "Silent wallet reconnect failed");
                None
            }
        }
    }
}
