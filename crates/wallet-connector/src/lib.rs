//! Uniform capability surface over an external wallet extension.
//!
//! The extension itself is an uncontrolled collaborator: it prompts a human,
//! and it fires connect/disconnect/account-change events whenever the user
//! acts in it. [`WalletExtension`] is the explicit interface such an
//! extension must offer; [`WalletConnector`] wraps one and translates its
//! raw results into typed addresses, signatures, errors and events.

mod connector;
mod error;
mod events;
mod extension;
mod install;
mod keypair;

pub use connector::WalletConnector;
pub use error::{WalletError, WalletResult};
pub use events::{WalletEvent, WalletEvents};
pub use extension::{
    AbsentExtension, ConnectOptions, ExtensionError, ExtensionEvent, MessageEncoding,
    SignedMessage, WalletExtension,
};
pub use install::{BrowserInstallPrompt, InstallPrompt};
pub use keypair::KeypairWallet;
