//! Known wallets, connect failures, and retries that start over.

use super::harness::{addr, api_error, session, BackendCall, Harness, ScriptedWallet};
use crate::{AuthErrorKind, AuthPhase, MachineOptions};
use backend_auth_client::BackendError;
use session_storage::MemoryStorage;
use std::sync::Arc;

#[tokio::test]
async fn known_wallet_skips_registration() {
    let h = Harness::new("Addr2");
    h.script_returning("Addr2", "sign-this-2", "sig2", session("Addr2", "bob", "tok2"));

    let snapshot = h.machine.connect_and_authenticate().await.unwrap();
    assert_eq!(snapshot.phase, AuthPhase::Authenticated);
    assert_eq!(snapshot.target, Some(addr("Addr2")));
    assert_eq!(snapshot.session.as_ref().unwrap().token, "tok2");

    assert_eq!(
        h.backend.calls(),
        vec![
            BackendCall::CheckWallet("Addr2".into()),
            BackendCall::RequestSignature("Addr2".into()),
            BackendCall::Verify {
                address: "Addr2".into(),
                message: "sign-this-2".into(),
                signature: "sig2".into(),
            },
        ]
    );
    assert!(h.intent.is_set());
    assert_eq!(h.store.load(), snapshot.session);
}

#[tokio::test]
async fn rejected_verify_retries_with_a_fresh_challenge() {
    let h = Harness::new("Addr2");
    h.backend.user_exists("Addr2");
    h.backend.user_exists("Addr2");
    h.backend.challenge("Addr2", "sign-this-2");
    h.backend.challenge("Addr2", "sign-this-3");
    h.wallet.sign_as("sig2");
    h.wallet.sign_as("sig3");
    h.backend
        .verify_fails("Addr2", api_error(401, "Invalid signature"));
    h.backend
        .verify_returns("Addr2", session("Addr2", "bob", "tok2"));

    let err = h.machine.connect_and_authenticate().await.unwrap_err();
    assert_eq!(err.kind(), AuthErrorKind::ApiError { status: 401 });

    let snapshot = h.machine.snapshot();
    assert_eq!(snapshot.phase, AuthPhase::Failed);
    assert!(snapshot.session.is_none());
    assert!(!snapshot.failure.unwrap().during_registration);
    assert_eq!(h.store.load(), None);

    let snapshot = h.machine.retry().await.unwrap();
    assert_eq!(snapshot.phase, AuthPhase::Authenticated);

    assert_eq!(
        h.backend
            .count(|c| matches!(c, BackendCall::CheckWallet(_))),
        2
    );
    assert_eq!(
        h.backend
            .count(|c| matches!(c, BackendCall::RequestSignature(_))),
        2
    );
    assert_eq!(
        h.backend.verify_messages(),
        vec!["sign-this-2".to_string(), "sign-this-3".to_string()]
    );
}

#[tokio::test]
async fn network_failure_is_transient_and_retryable() {
    let h = Harness::new("Addr2");
    h.backend
        .check_wallet_fails("Addr2", BackendError::Network("connection reset".into()));
    h.script_returning("Addr2", "sign-this-2", "sig2", session("Addr2", "bob", "tok2"));

    let err = h.machine.connect_and_authenticate().await.unwrap_err();
    assert_eq!(err.kind(), AuthErrorKind::NetworkError);
    assert!(err.is_transient());

    let snapshot = h.machine.retry().await.unwrap();
    assert_eq!(snapshot.phase, AuthPhase::Authenticated);
}

#[tokio::test]
async fn invalid_backend_response_counts_as_network_error() {
    let h = Harness::new("Addr2");
    h.backend.user_exists("Addr2");
    h.backend.challenge("Addr2", "sign-this-2");
    h.wallet.sign_as("sig2");
    h.backend
        .verify_fails("Addr2", BackendError::InvalidResponse("missing accessToken".into()));

    let err = h.machine.connect_and_authenticate().await.unwrap_err();
    assert_eq!(err.kind(), AuthErrorKind::NetworkError);
    assert_eq!(h.machine.phase(), AuthPhase::Failed);
}

#[tokio::test]
async fn rejected_connect_fails_without_an_address() {
    let h = Harness::new("Addr1");
    h.wallet.reject_connect();

    let err = h.machine.connect_and_authenticate().await.unwrap_err();
    assert_eq!(err.kind(), AuthErrorKind::UserRejected);

    let snapshot = h.machine.snapshot();
    assert_eq!(snapshot.phase, AuthPhase::Failed);
    assert_eq!(snapshot.target, None);
    assert!(h.backend.calls().is_empty());
    assert!(!h.intent.is_set());

    // Nothing to restart without an address
    let snapshot = h.machine.retry().await.unwrap();
    assert_eq!(snapshot.phase, AuthPhase::Idle);
    assert!(h.backend.calls().is_empty());
}

#[tokio::test]
async fn missing_extension_reports_wallet_unavailable() {
    let h = Harness::build(
        ScriptedWallet::absent(),
        Arc::new(MemoryStorage::new()),
        MachineOptions::default(),
    );

    let err = h.machine.connect_and_authenticate().await.unwrap_err();
    assert_eq!(err.kind(), AuthErrorKind::WalletUnavailable);
    assert_eq!(
        h.machine.snapshot().failure.unwrap().kind(),
        AuthErrorKind::WalletUnavailable
    );
}

#[tokio::test]
async fn connecting_again_while_authenticated_keeps_the_session() {
    let h = Harness::new("Addr2");
    let session = h.login("Addr2", "bob", "tok2").await;
    let before = h.machine.snapshot();

    let snapshot = h.machine.connect_and_authenticate().await.unwrap();
    assert_eq!(snapshot.attempt, before.attempt);
    assert_eq!(snapshot.session, Some(session));
    assert_eq!(
        h.backend
            .count(|c| matches!(c, BackendCall::CheckWallet(_))),
        1
    );
}

#[tokio::test]
async fn retry_outside_failed_is_rejected() {
    let h = Harness::new("Addr2");
    let err = h.machine.retry().await.unwrap_err();
    assert_eq!(err.kind(), AuthErrorKind::InvalidStateTransition);
}

#[tokio::test]
async fn extension_sign_fault_is_recoverable() {
    let h = Harness::new("Addr2");
    h.backend.user_exists("Addr2");
    h.backend.challenge("Addr2", "sign-this-2");
    h.wallet.fail_next_sign("extension crashed");

    let err = h.machine.connect_and_authenticate().await.unwrap_err();
    assert_eq!(err.kind(), AuthErrorKind::WalletError);
    assert!(err.is_transient());
    assert_eq!(
        h.machine.snapshot().failure.unwrap().kind(),
        AuthErrorKind::WalletError
    );

    h.script_returning("Addr2", "sign-this-3", "sig3", session("Addr2", "bob", "tok3"));
    let snapshot = h.machine.retry().await.unwrap();
    assert_eq!(snapshot.phase, AuthPhase::Authenticated);
    assert_eq!(h.backend.verify_messages(), vec!["sign-this-3".to_string()]);
}
