//! Scenario tests for the auth session machine.
//!
//! - `harness.rs`         - scripted backend, scripted wallet, wired machine
//! - `registration.rs`    - new wallets: profile form, register, retry
//! - `returning.rs`       - known wallets, connect failures, fresh challenges on retry
//! - `challenge_refresh.rs` - expired or consumed challenges during verify
//! - `account_switch.rs`  - wallet events and discarding results of abandoned attempts
//! - `logout.rs`          - logout, disconnect and local profile edits
//! - `bootstrap.rs`       - restoring a persisted session at startup

mod account_switch;
mod returning;
