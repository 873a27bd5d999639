//! Wallet authentication state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//!                 ┌──────────┐  SessionRestored (bootstrap)
//!                 │   Idle   │ ─────────────────────────────────┐
//!                 └────┬─────┘                                  │
//!                      │ WalletConnected                        │
//!                      ▼                                        │
//!              ┌────────────────┐  UserMissing  ┌─────────────────────┐
//!              │ CheckingWallet │ ────────────► │ AwaitingProfileForm │
//!              └───────┬────────┘               └──────────┬──────────┘
//!                      │ UserFound                         │ ProfileSubmitted
//!                      ▼                                   ▼
//!             ┌───────────────────┐                 ┌─────────────┐
//!             │ AwaitingChallenge │                 │ Registering │
//!             └─────────┬─────────┘                 └──────┬──────┘
//!                       │ ChallengeIssued                  │ ChallengeIssued
//!                       ▼                                  │
//!             ┌───────────────────┐ ◄──────────────────────┘
//!             │ AwaitingSignature │
//!             └─────────┬─────────┘
//!                       │ MessageSigned
//!                       ▼
//!                ┌─────────────┐ ChallengeExpired ──► AwaitingChallenge
//!                │  Verifying  │
//!                └──────┬──────┘
//!                       │ Verified
//!                       ▼
//!               ┌───────────────┐
//!               │ Authenticated │ ◄─────────────────────────────┘
//!               └───────────────┘
//!
//! Any step --Failure--> Failed --Reset--> Idle
//!                              --ReturnToForm--> AwaitingProfileForm
//! Any non-idle state --Reset--> Idle
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub auth_machine(Idle)

    Idle => {
        WalletConnected => CheckingWallet,
        // Bootstrap found a stored session for the still-connected wallet
        SessionRestored => Authenticated,
        // Connect itself failed (no extension, user declined)
        Failure => Failed
    },
    CheckingWallet => {
        UserFound => AwaitingChallenge,
        UserMissing => AwaitingProfileForm,
        Failure => Failed,
        Reset => Idle
    },
    AwaitingChallenge => {
        ChallengeIssued => AwaitingSignature,
        Failure => Failed,
        Reset => Idle
    },
    AwaitingProfileForm => {
        ProfileSubmitted => Registering,
        Reset => Idle
    },
    Registering => {
        // Register answers with the first challenge
        ChallengeIssued => AwaitingSignature,
        Failure => Failed,
        Reset => Idle
    },
    AwaitingSignature => {
        MessageSigned => Verifying,
        Failure => Failed,
        Reset => Idle
    },
    Verifying => {
        Verified => Authenticated,
        // Challenge expired or consumed: request a fresh one, never re-verify
        ChallengeExpired => AwaitingChallenge,
        Failure => Failed,
        Reset => Idle
    },
    Authenticated => {
        Reset => Idle
    },
    Failed => {
        Reset => Idle,
        ReturnToForm => AwaitingProfileForm
    }
}

pub use auth_machine::Input as AuthMachineInput;
pub use auth_machine::State as AuthMachineState;
pub use auth_machine::StateMachine as AuthMachine;

/// Phase of the auth machine as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPhase {
    Idle,
    CheckingWallet,
    AwaitingChallenge,
    AwaitingSignature,
    Verifying,
    Authenticated,
    AwaitingProfileForm,
    Registering,
    Failed,
}

impl AuthPhase {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthPhase::Authenticated)
    }

    /// A handshake step is in flight.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AuthPhase::CheckingWallet
                | AuthPhase::AwaitingChallenge
                | AuthPhase::AwaitingSignature
                | AuthPhase::Verifying
                | AuthPhase::Registering
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthPhase::Idle => "idle",
            AuthPhase::CheckingWallet => "checking_wallet",
            AuthPhase::AwaitingChallenge => "awaiting_challenge",
            AuthPhase::AwaitingSignature => "awaiting_signature",
            AuthPhase::Verifying => "verifying",
            AuthPhase::Authenticated => "authenticated",
            AuthPhase::AwaitingProfileForm => "awaiting_profile_form",
            AuthPhase::Registering => "registering",
            AuthPhase::Failed => "failed",
        }
    }
}

impl std::fmt::Display for AuthPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&AuthMachineState> for AuthPhase {
    fn from(state: &AuthMachineState) -> Self {
        match state {
            AuthMachineState::Idle => AuthPhase::Idle,
            AuthMachineState::CheckingWallet => AuthPhase::CheckingWallet,
            AuthMachineState::AwaitingChallenge => AuthPhase::AwaitingChallenge,
            AuthMachineState::AwaitingSignature => AuthPhase::AwaitingSignature,
            AuthMachineState::Verifying => AuthPhase::Verifying,
            AuthMachineState::Authenticated => AuthPhase::Authenticated,
            AuthMachineState::AwaitingProfileForm => AuthPhase::AwaitingProfileForm,
            AuthMachineState::Registering => AuthPhase::Registering,
            AuthMachineState::Failed => AuthPhase::Failed,
        }
    }
}
