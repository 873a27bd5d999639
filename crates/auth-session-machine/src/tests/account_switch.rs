//! Wallet events, and results that arrive for an abandoned attempt.

use super::harness::{addr, session, BackendCall, Harness};
use crate::{AuthError, AuthPhase};
use backend_auth_client::BackendError;
use wallet_connector::WalletEvent;

#[tokio::test]
async fn account_change_invalidates_session_immediately() {
    let h = Harness::new("Addr1");
    h.login("Addr1", "alice", "tok1").await;
    assert!(h.store.load().is_some());

    let gate = h.backend.hold("check_wallet", "Addr2");
    h.backend.user_missing("Addr2");
    h.wallet.switch_account(Some("Addr2"));
    h.machine
        .handle_wallet_event(WalletEvent::AccountChanged(Some(addr("Addr2"))));

    // Observable before any network call completes
    let snapshot = h.machine.snapshot();
    assert_eq!(snapshot.phase, AuthPhase::CheckingWallet);
    assert_eq!(snapshot.target, Some(addr("Addr2")));
    assert!(snapshot.session.is_none());
    assert!(!snapshot.profile_completed);
    assert_eq!(h.store.load(), None);
    assert!(!h.store.profile_completed());

    gate.notify_one();
    let snapshot = h.wait_for_phase(AuthPhase::AwaitingProfileForm).await;
    assert_eq!(snapshot.target, Some(addr("Addr2")));
}

#[tokio::test]
async fn same_address_event_changes_nothing() {
    let h = Harness::new("Addr1");
    let session = h.login("Addr1", "alice", "tok1").await;
    let before = h.machine.snapshot();

    h.machine
        .handle_wallet_event(WalletEvent::Connected(addr("Addr1")));
    h.machine
        .handle_wallet_event(WalletEvent::AccountChanged(Some(addr("Addr1"))));
    h.settle_tasks().await;

    assert_eq!(h.machine.snapshot(), before);
    assert_eq!(h.machine.session(), Some(session));
    assert_eq!(h.backend.calls().len(), 3);
}

#[tokio::test]
async fn disconnect_event_clears_session() {
    let h = Harness::new("Addr1");
    h.login("Addr1", "alice", "tok1").await;

    h.machine.handle_wallet_event(WalletEvent::Disconnected);

    let snapshot = h.machine.snapshot();
    assert_eq!(snapshot.phase, AuthPhase::Idle);
    assert_eq!(snapshot.target, None);
    assert!(snapshot.session.is_none());
    assert_eq!(h.store.load(), None);
    assert!(!h.intent.is_set());
}

#[tokio::test]
async fn account_change_to_unapproved_account_disconnects() {
    let h = Harness::new("Addr1");
    h.login("Addr1", "alice", "tok1").await;

    h.machine.handle_wallet_event(WalletEvent::AccountChanged(None));

    assert_eq!(h.machine.phase(), AuthPhase::Idle);
    assert!(h.machine.session().is_none());
    assert_eq!(h.store.load(), None);
}

#[tokio::test]
async fn stale_check_wallet_result_is_discarded() {
    let h = Harness::new("Addr1");
    h.wallet.switch_account(Some("Addr1"));
    h.backend.user_exists("Addr1");
    h.backend.challenge("Addr1", "sign-this-1");
    let gate = h.backend.hold("check_wallet", "Addr1");

    h.machine
        .handle_wallet_event(WalletEvent::Connected(addr("Addr1")));
    h.backend
        .wait_for_call(|c| *c == BackendCall::CheckWallet("Addr1".into()))
        .await;

    h.wallet.switch_account(Some("Addr2"));
    h.script_returning("Addr2", "sign-this-2", "sig2", session("Addr2", "bob", "tok2"));
    h.machine
        .handle_wallet_event(WalletEvent::AccountChanged(Some(addr("Addr2"))));
    let snapshot = h.wait_for_phase(AuthPhase::Authenticated).await;
    assert_eq!(snapshot.target, Some(addr("Addr2")));

    // Addr1's answer lands after Addr2 is signed in
    gate.notify_one();
    h.settle_tasks().await;

    let snapshot = h.machine.snapshot();
    assert_eq!(snapshot.phase, AuthPhase::Authenticated);
    assert_eq!(snapshot.session.unwrap().token, "tok2");
    assert_eq!(
        h.backend
            .count(|c| *c == BackendCall::RequestSignature("Addr1".into())),
        0
    );
    assert_eq!(h.wallet.signed_messages(), vec!["sign-this-2".to_string()]);
}

#[tokio::test]
async fn stale_verify_failure_is_discarded() {
    let h = Harness::new("Addr1");
    h.wallet.switch_account(Some("Addr1"));
    h.backend.user_exists("Addr1");
    h.backend.challenge("Addr1", "sign-this-1");
    h.wallet.sign_as("sig1");
    h.backend
        .verify_fails("Addr1", BackendError::Network("timed out".into()));
    let gate = h.backend.hold("verify", "Addr1");

    h.machine
        .handle_wallet_event(WalletEvent::Connected(addr("Addr1")));
    h.backend
        .wait_for_call(|c| matches!(c, BackendCall::Verify { .. }))
        .await;
    assert_eq!(h.machine.phase(), AuthPhase::Verifying);

    h.machine.handle_wallet_event(WalletEvent::Disconnected);
    gate.notify_one();
    h.settle_tasks().await;

    let snapshot = h.machine.snapshot();
    assert_eq!(snapshot.phase, AuthPhase::Idle);
    assert!(snapshot.failure.is_none());
}

#[tokio::test]
async fn pending_call_reports_superseded() {
    let h = Harness::new("Addr1");
    h.backend.user_exists("Addr1");
    let gate = h.backend.hold("check_wallet", "Addr1");

    let machine = h.machine.clone();
    let call = tokio::spawn(async move { machine.connect_and_authenticate().await });
    h.backend
        .wait_for_call(|c| matches!(c, BackendCall::CheckWallet(_)))
        .await;

    h.machine.handle_wallet_event(WalletEvent::Disconnected);
    assert_eq!(call.await.unwrap(), Err(AuthError::Superseded));

    gate.notify_one();
    h.settle_tasks().await;
    assert_eq!(h.machine.phase(), AuthPhase::Idle);
}

#[tokio::test]
async fn listener_follows_wallet_events() {
    let h = Harness::new("Addr1");
    let listener = h.machine.spawn_wallet_listener();

    h.script_returning("Addr1", "sign-this-1", "sig1", session("Addr1", "alice", "tok1"));
    h.machine.wallet().connect().await.unwrap();
    let snapshot = h.wait_for_phase(AuthPhase::Authenticated).await;
    assert_eq!(snapshot.target, Some(addr("Addr1")));

    h.backend.user_missing("Addr2");
    h.wallet.switch_account(Some("Addr2"));
    let snapshot = h
        .wait_for(|s| s.phase == AuthPhase::AwaitingProfileForm)
        .await;
    assert_eq!(snapshot.target, Some(addr("Addr2")));
    assert!(snapshot.session.is_none());
    assert_eq!(h.intent.last_address(), Some(addr("Addr2")));

    h.machine.wallet().disconnect().await;
    h.wait_for(|s| s.phase == AuthPhase::Idle && s.target.is_none())
        .await;
    assert_eq!(h.store.load(), None);

    listener.abort();
}
