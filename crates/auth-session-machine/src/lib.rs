//! Wallet-linked sign-in for SolVibe.
//!
//! [`AuthSessionMachine`] combines a [`wallet_connector::WalletConnector`],
//! a [`backend_auth_client::BackendAuthClient`] and a
//! [`session_storage::SessionStore`] into one state machine that answers
//! "who is the user, and is it safe to call the backend as them?".
//!
//! The machine moves through [`AuthPhase`]s driven by wallet events and the
//! results of backend calls. Each run of the handshake is an attempt; an
//! account switch, disconnect or logout abandons the current attempt, and any
//! result that arrives for an abandoned attempt is dropped.

pub mod auth_fsm;
mod error;
mod listener;
mod machine;

pub use auth_fsm::AuthPhase;
pub use error::{AuthError, AuthErrorKind, AuthFailure, AuthResult};
pub use machine::{AuthSessionMachine, AuthSnapshot, MachineOptions};

#[cfg(test)]
mod tests;
