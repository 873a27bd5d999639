//! CLI command implementations.

mod auth;
mod profile;
mod wallet;

pub use auth::{login, logout, status, LoginArgs};
pub use profile::{profile_show, profile_update};
pub use wallet::{wallet_address, wallet_disconnect, wallet_new};

use anyhow::{Context as _, Result};
use auth_session_machine::{AuthSessionMachine, MachineOptions};
use backend_auth_client::HttpBackendClient;
use session_storage::{create_storage, SessionStore, WalletIntentStore};
use solvibe_core::{Config, Paths};
use std::sync::Arc;
use tracing::debug;
use wallet_connector::{BrowserInstallPrompt, KeypairWallet, WalletConnector};

/// Everything a command needs, wired from `~/.solvibe`.
pub struct Context {
    pub paths: Paths,
    pub config: Config,
    pub backend: Arc<HttpBackendClient>,
    pub machine: AuthSessionMachine,
}

impl Context {
    /// Load config, open storage and the local wallet key, and restore any
    /// persisted session.
    pub async fn open(api_url: Option<&str>) -> Result<Self> {
        let paths = Paths::new()?;
        paths.ensure_dirs()?;

        let mut config = Config::load(&paths).context("Failed to load config")?;
        if let Some(url) = api_url {
            config.api_base_url = url.to_string();
            config.validate()?;
        }
        debug!(api_base_url = %config.api_base_url, "Using backend");

        let storage = create_storage(&paths)?;
        let wallet = KeypairWallet::load_or_create(&paths.wallet_key_file())
            .context("Failed to load wallet key")?;
        let connector = WalletConnector::new(
            Arc::new(wallet),
            WalletIntentStore::new(storage.clone()),
        )
        .with_install_prompt(Arc::new(BrowserInstallPrompt), config.wallet_install_url.clone());

        let backend = Arc::new(HttpBackendClient::from_config(&config)?);
        let machine = AuthSessionMachine::new(
            connector,
            backend.clone(),
            SessionStore::new(storage),
            MachineOptions::from_config(&config),
        );
        machine.bootstrap().await?;

        Ok(Self {
            paths,
            config,
            backend,
            machine,
        })
    }
}
