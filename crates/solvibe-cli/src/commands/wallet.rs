//! Local wallet commands.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::{bail, Result};
use serde::Serialize;
use std::fmt;
use tracing::info;
use wallet_connector::{KeypairWallet, WalletEvent};

#[derive(Serialize)]
struct WalletView {
    address: String,
    key_file: String,
    connected: bool,
}

impl fmt::Display for WalletView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", output::row("Address", &self.address))?;
        writeln!(f, "{}", output::row("Key file", &self.key_file))?;
        let connected = if self.connected { "yes" } else { "no" };
        write!(f, "{}", output::row("Connected", connected))
    }
}

/// Print the local wallet's address.
pub async fn wallet_address(ctx: &Context, format: &OutputFormat) -> Result<()> {
    let key_file = ctx.paths.wallet_key_file();
    let wallet = KeypairWallet::load_or_create(&key_file)?;
    let view = WalletView {
        address: wallet.public_key_base58().to_string(),
        key_file: key_file.display().to_string(),
        connected: ctx.machine.wallet().is_connected(),
    };
    output::print(&view, format);
    Ok(())
}

/// Replace the local wallet key. The old address's session is dropped.
pub async fn wallet_new(ctx: &Context, force: bool, format: &OutputFormat) -> Result<()> {
    let key_file = ctx.paths.wallet_key_file();
    if key_file.exists() && !force {
        bail!(
            "A wallet key already exists at {}. Pass --force to replace it",
            key_file.display()
        );
    }

    ctx.machine.logout().await;
    let wallet = KeypairWallet::generate();
    wallet.save(&key_file)?;
    info!(public_key = %wallet.public_key_base58(), "Replaced wallet key");

    output::print_success(
        &format!("New wallet address: {}", wallet.public_key_base58()),
        format,
    );
    Ok(())
}

/// Disconnect the wallet. Like the extension dropping the site, this ends
/// the session.
pub async fn wallet_disconnect(ctx: &Context, format: &OutputFormat) -> Result<()> {
    ctx.machine.wallet().disconnect().await;
    ctx.machine.handle_wallet_event(WalletEvent::Disconnected);
    output::print_success("Wallet disconnected", format);
    Ok(())
}
