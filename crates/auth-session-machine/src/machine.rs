//! Auth session machine.
//!
//! Drives the wallet handshake (check wallet, optional registration,
//! challenge, signature, verify) and owns the resulting session. All state
//! lives behind one mutex that is never held across an `.await`; every
//! network or wallet step runs in a spawned task tagged with the attempt it
//! belongs to, and its result is only applied if that attempt is still
//! current.

use crate::auth_fsm::{AuthMachine, AuthMachineInput, AuthPhase};
use crate::error::{AuthError, AuthFailure, AuthResult};
use backend_auth_client::{BackendAuthClient, BackendError};
use parking_lot::Mutex;
use session_storage::SessionStore;
use solvibe_core::{
    Challenge, Config, ProfileFields, ProfileUpdate, Session, UserProfile, WalletAddress,
    DEFAULT_MAX_CHALLENGE_REFRESHES,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use wallet_connector::{WalletConnector, WalletEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineOptions {
    /// How many times one attempt may fetch a new challenge after verify
    /// reports the current one as expired or consumed.
    pub max_challenge_refreshes: u32,
}

impl Default for MachineOptions {
    fn default() -> Self {
        Self {
            max_challenge_refreshes: DEFAULT_MAX_CHALLENGE_REFRESHES,
        }
    }
}

impl MachineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_challenge_refreshes: config.max_challenge_refreshes,
        }
    }
}

/// Everything an observer needs to render the auth state.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSnapshot {
    pub phase: AuthPhase,
    /// Bumped whenever a new handshake starts or the current one is abandoned.
    pub attempt: u64,
    /// Address the current attempt (or session) belongs to.
    pub target: Option<WalletAddress>,
    pub session: Option<Session>,
    pub failure: Option<AuthFailure>,
    pub profile_completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Returning,
    Registration,
}

enum HandshakeStep {
    CheckWallet,
    Register(ProfileFields),
}

enum RetryPlan {
    Settled(AuthSnapshot),
    Restart(u64, WalletAddress),
}

struct Inner {
    fsm: AuthMachine,
    attempt: u64,
    target: Option<WalletAddress>,
    session: Option<Session>,
    failure: Option<AuthFailure>,
    pending_profile: Option<ProfileFields>,
    flow: Flow,
    challenge_refreshes: u32,
    profile_completed: bool,
}

impl Inner {
    fn new() -> Self {
        Self {
            fsm: AuthMachine::new(),
            attempt: 0,
            target: None,
            session: None,
            failure: None,
            pending_profile: None,
            flow: Flow::Returning,
            challenge_refreshes: 0,
            profile_completed: false,
        }
    }

    fn phase(&self) -> AuthPhase {
        AuthPhase::from(self.fsm.state())
    }

    fn snapshot(&self) -> AuthSnapshot {
        AuthSnapshot {
            phase: self.phase(),
            attempt: self.attempt,
            target: self.target.clone(),
            session: self.session.clone(),
            failure: self.failure.clone(),
            profile_completed: self.profile_completed,
        }
    }

    fn transition(&mut self, input: AuthMachineInput) -> AuthResult<AuthPhase> {
        let old_phase = self.phase();
        self.fsm.consume(&input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {}",
                input, old_phase
            ))
        })?;
        let new_phase = self.phase();
        debug!(
            attempt = self.attempt,
            old_state = %old_phase,
            new_state = %new_phase,
            "Auth state transition"
        );
        Ok(new_phase)
    }

    fn reset_to_idle(&mut self) {
        if self.phase() == AuthPhase::Idle {
            return;
        }
        if let Err(e) = self.transition(AuthMachineInput::Reset) {
            warn!(error = %e, "Failed to reset auth state");
        }
    }

    fn is_stale(&self, attempt: u64) -> bool {
        self.attempt != attempt
    }
}

struct Shared {
    inner: Mutex<Inner>,
    snapshots: watch::Sender<AuthSnapshot>,
    wallet: WalletConnector,
    backend: Arc<dyn BackendAuthClient>,
    store: SessionStore,
    options: MachineOptions,
}

/// Cheaply clonable handle to one auth session machine.
#[derive(Clone)]
pub struct AuthSessionMachine {
    shared: Arc<Shared>,
}

impl AuthSessionMachine {
    pub fn new(
        wallet: WalletConnector,
        backend: Arc<dyn BackendAuthClient>,
        store: SessionStore,
        options: MachineOptions,
    ) -> Self {
        let inner = Inner::new();
        let (snapshots, _) = watch::channel(inner.snapshot());
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(inner),
                snapshots,
                wallet,
                backend,
                store,
                options,
            }),
        }
    }

    pub fn phase(&self) -> AuthPhase {
        self.shared.inner.lock().phase()
    }

    pub fn session(&self) -> Option<Session> {
        self.shared.inner.lock().session.clone()
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.shared.inner.lock().snapshot()
    }

    /// Receiver that sees every published snapshot, starting with the
    /// current one.
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.shared.snapshots.subscribe()
    }

    /// Fields of the last submitted profile, kept until the attempt
    /// succeeds so a failed registration can be resubmitted.
    pub fn pending_profile(&self) -> Option<ProfileFields> {
        self.shared.inner.lock().pending_profile.clone()
    }

    pub fn profile_completed(&self) -> bool {
        self.shared.inner.lock().profile_completed
    }

    pub fn wallet(&self) -> &WalletConnector {
        &self.shared.wallet
    }

    /// Restore a persisted session without touching the network.
    ///
    /// The stored session is only trusted if the wallet silently reconnects
    /// with the same address. Anything else clears the store and leaves the
    /// machine idle.
    pub async fn bootstrap(&self) -> AuthResult<AuthSnapshot> {
        {
            let inner = self.shared.inner.lock();
            let phase = inner.phase();
            if phase != AuthPhase::Idle {
                return Err(AuthError::InvalidStateTransition(format!(
                    "Cannot bootstrap in state {phase}"
                )));
            }
        }

        let stored = self.shared.store.load();
        let restored = self.shared.wallet.restore().await;
        self.finish_bootstrap(stored, restored)
    }

    fn finish_bootstrap(
        &self,
        stored: Option<Session>,
        restored: Option<WalletAddress>,
    ) -> AuthResult<AuthSnapshot> {
        let mut inner = self.shared.inner.lock();
        if inner.phase() != AuthPhase::Idle {
            debug!(phase = %inner.phase(), "Auth state moved during bootstrap, keeping it");
            return Ok(inner.snapshot());
        }

        match (stored, restored) {
            (Some(session), Some(address)) if session.address() == &address => {
                inner.transition(AuthMachineInput::SessionRestored)?;
                inner.attempt += 1;
                inner.target = Some(address);
                inner.profile_completed = true;
                if !self.shared.store.profile_completed() {
                    self.persist_profile_completed();
                }
                info!(wallet_address = %session.address(), "Restored stored session");
                inner.session = Some(session);
            }
            (Some(session), restored) => {
                info!(
                    stored_address = %session.address(),
                    connected_address = ?restored.as_ref().map(WalletAddress::as_str),
                    "Stored session does not match the connected wallet, discarding"
                );
                self.clear_persisted();
            }
            (None, _) => {
                debug!("No stored session");
                self.clear_persisted();
            }
        }

        self.publish(&inner);
        Ok(inner.snapshot())
    }

    /// Connect the wallet and run the handshake until it settles.
    ///
    /// Returns the snapshot once the machine is authenticated or waiting for
    /// the profile form. Fails with the error that put the machine into
    /// `Failed`, or [`AuthError::Superseded`] if a newer attempt took over.
    pub async fn connect_and_authenticate(&self) -> AuthResult<AuthSnapshot> {
        let address = match self.shared.wallet.connect().await {
            Ok(address) => address,
            Err(e) => {
                let error = AuthError::from(e);
                self.fail_connect(error.clone());
                return Err(error);
            }
        };

        let attempt = self.on_connected(address);
        self.settle(attempt).await
    }

    /// Submit the profile form and run registration through verify.
    pub async fn submit_profile(&self, fields: ProfileFields) -> AuthResult<AuthSnapshot> {
        let fields = fields.normalized()?;

        let (attempt, address) = {
            let mut inner = self.shared.inner.lock();
            let phase = inner.phase();
            if phase != AuthPhase::AwaitingProfileForm {
                return Err(AuthError::InvalidStateTransition(format!(
                    "Cannot submit a profile in state {phase}"
                )));
            }
            let Some(address) = inner.target.clone() else {
                return Err(AuthError::InvalidStateTransition(
                    "No wallet address to register".to_string(),
                ));
            };

            inner.transition(AuthMachineInput::ProfileSubmitted)?;
            inner.attempt += 1;
            inner.flow = Flow::Registration;
            inner.pending_profile = Some(fields.clone());
            inner.challenge_refreshes = 0;
            inner.failure = None;
            self.publish(&inner);
            (inner.attempt, address)
        };

        info!(wallet_address = %address, username = %fields.username, "Registering new user");
        self.spawn_handshake(attempt, address, HandshakeStep::Register(fields));
        self.settle(attempt).await
    }

    /// Recover from `Failed`.
    ///
    /// A failure after a profile was submitted goes back to the profile form
    /// with the submitted fields still available. Any other failure starts a
    /// fresh handshake (new check-wallet, new challenge) for the same
    /// address, or goes idle if no address is known.
    pub async fn retry(&self) -> AuthResult<AuthSnapshot> {
        let plan = {
            let mut inner = self.shared.inner.lock();
            let phase = inner.phase();
            if phase != AuthPhase::Failed {
                return Err(AuthError::InvalidStateTransition(format!(
                    "Nothing to retry in state {phase}"
                )));
            }

            let during_registration = inner
                .failure
                .as_ref()
                .is_some_and(|f| f.during_registration);
            inner.failure = None;

            match inner.target.clone() {
                Some(_) if during_registration && inner.pending_profile.is_some() => {
                    inner.transition(AuthMachineInput::ReturnToForm)?;
                    inner.attempt += 1;
                    self.publish(&inner);
                    RetryPlan::Settled(inner.snapshot())
                }
                Some(address) => {
                    let attempt = self.begin_handshake(&mut inner, address.clone())?;
                    RetryPlan::Restart(attempt, address)
                }
                None => {
                    inner.transition(AuthMachineInput::Reset)?;
                    inner.attempt += 1;
                    self.publish(&inner);
                    RetryPlan::Settled(inner.snapshot())
                }
            }
        };

        match plan {
            RetryPlan::Settled(snapshot) => Ok(snapshot),
            RetryPlan::Restart(attempt, address) => {
                info!(attempt, wallet_address = %address, "Retrying authentication");
                self.spawn_handshake(attempt, address, HandshakeStep::CheckWallet);
                self.settle(attempt).await
            }
        }
    }

    /// Drop the session, clear the store and disconnect the wallet.
    /// Safe to call in any phase and any number of times.
    pub async fn logout(&self) -> AuthSnapshot {
        let snapshot = {
            let mut inner = self.shared.inner.lock();
            self.abandon(&mut inner);
            self.publish(&inner);
            inner.snapshot()
        };

        self.shared.wallet.disconnect().await;
        info!("Logged out");
        snapshot
    }

    /// Merge a local edit into the session's user and persist it.
    pub fn update_profile(&self, update: ProfileUpdate) -> AuthResult<UserProfile> {
        let mut inner = self.shared.inner.lock();
        let Some(session) = inner.session.as_mut() else {
            return Err(AuthError::InvalidStateTransition(
                "Cannot update a profile without a session".to_string(),
            ));
        };

        update.apply_to(&mut session.user)?;
        let session = session.clone();
        self.persist_session(&session);
        debug!(wallet_address = %session.address(), "Profile updated");

        self.publish(&inner);
        Ok(session.user)
    }

    /// Apply a wallet event.
    ///
    /// A new or different address invalidates the session and restarts the
    /// handshake; the same address while in flight or authenticated changes
    /// nothing. Losing the connection clears the session and goes idle.
    /// Must be called from within a tokio runtime.
    pub fn handle_wallet_event(&self, event: WalletEvent) {
        self.shared.wallet.record_event(&event);
        match event {
            WalletEvent::Connected(address) | WalletEvent::AccountChanged(Some(address)) => {
                self.on_connected(address);
            }
            WalletEvent::Disconnected | WalletEvent::AccountChanged(None) => {
                self.on_disconnected();
            }
        }
    }

    fn on_connected(&self, address: WalletAddress) -> u64 {
        let attempt = {
            let mut inner = self.shared.inner.lock();
            let phase = inner.phase();
            let settled_for_address = phase.is_transient()
                || matches!(
                    phase,
                    AuthPhase::Authenticated | AuthPhase::AwaitingProfileForm
                );
            if inner.target.as_ref() == Some(&address) && settled_for_address {
                debug!(wallet_address = %address, phase = %phase, "Wallet address unchanged");
                return inner.attempt;
            }

            if let Some(previous) = inner.target.as_ref().filter(|prev| *prev != &address) {
                info!(
                    from = %previous,
                    to = %address,
                    "Wallet account changed, restarting authentication"
                );
            }

            match self.begin_handshake(&mut inner, address.clone()) {
                Ok(attempt) => attempt,
                Err(e) => {
                    warn!(error = %e, "Failed to start authentication");
                    return inner.attempt;
                }
            }
        };

        self.spawn_handshake(attempt, address, HandshakeStep::CheckWallet);
        attempt
    }

    fn on_disconnected(&self) {
        let mut inner = self.shared.inner.lock();
        if inner.phase() == AuthPhase::Idle && inner.target.is_none() && inner.session.is_none() {
            debug!("Wallet disconnected while idle");
            return;
        }

        match inner.target.as_ref() {
            Some(address) => info!(
                wallet_address = %address,
                "Wallet disconnected, clearing authentication"
            ),
            None => info!("Wallet disconnected, clearing authentication"),
        }
        self.abandon(&mut inner);
        self.publish(&inner);
    }

    fn fail_connect(&self, error: AuthError) {
        warn!(kind = ?error.kind(), error = %error, "Wallet connect failed");
        let mut inner = self.shared.inner.lock();
        match inner.phase() {
            AuthPhase::Idle | AuthPhase::Failed => {
                inner.reset_to_idle();
                inner.attempt += 1;
                inner.target = None;
                inner.pending_profile = None;
                inner.flow = Flow::Returning;
                self.fail_locked(&mut inner, error);
            }
            phase => debug!(phase = %phase, "Keeping current auth state after connect failure"),
        }
    }

    /// Start a new attempt for `address`. Any session is dropped.
    fn begin_handshake(&self, inner: &mut Inner, address: WalletAddress) -> AuthResult<u64> {
        if inner.session.is_some() || inner.target.as_ref() != Some(&address) {
            self.drop_session(inner);
        }
        inner.reset_to_idle();

        inner.attempt += 1;
        inner.target = Some(address);
        inner.failure = None;
        inner.pending_profile = None;
        inner.flow = Flow::Returning;
        inner.challenge_refreshes = 0;
        inner.transition(AuthMachineInput::WalletConnected)?;
        self.publish(inner);
        Ok(inner.attempt)
    }

    /// Invalidate the current attempt and session and go idle.
    fn abandon(&self, inner: &mut Inner) {
        inner.attempt += 1;
        self.drop_session(inner);
        inner.target = None;
        inner.failure = None;
        inner.pending_profile = None;
        inner.flow = Flow::Returning;
        inner.challenge_refreshes = 0;
        inner.reset_to_idle();
    }

    fn drop_session(&self, inner: &mut Inner) {
        if let Some(session) = inner.session.take() {
            debug!(wallet_address = %session.address(), "Dropping session");
        }
        inner.profile_completed = false;
        self.clear_persisted();
    }

    async fn settle(&self, attempt: u64) -> AuthResult<AuthSnapshot> {
        let mut rx = self.shared.snapshots.subscribe();
        let snapshot = {
            let settled = rx
                .wait_for(|s| s.attempt != attempt || !s.phase.is_transient())
                .await
                .map_err(|_| AuthError::Superseded)?;
            AuthSnapshot::clone(&settled)
        };

        if snapshot.attempt != attempt {
            return Err(AuthError::Superseded);
        }
        match (&snapshot.phase, &snapshot.failure) {
            (AuthPhase::Failed, Some(failure)) => Err(failure.error.clone()),
            _ => Ok(snapshot),
        }
    }

    fn spawn_handshake(&self, attempt: u64, address: WalletAddress, step: HandshakeStep) {
        let machine = self.clone();
        tokio::spawn(async move { machine.run_handshake(attempt, address, step).await });
    }

    async fn run_handshake(self, attempt: u64, address: WalletAddress, step: HandshakeStep) {
        let challenge = match step {
            HandshakeStep::CheckWallet => {
                debug!(attempt, wallet_address = %address, "Checking wallet");
                let response = match self.shared.backend.check_wallet(&address).await {
                    Ok(response) => response,
                    Err(e) => {
                        self.fail(attempt, e.into());
                        return;
                    }
                };

                if !response.exists {
                    if self.commit(attempt, AuthMachineInput::UserMissing) {
                        info!(attempt, wallet_address = %address, "No user for wallet, awaiting profile");
                    }
                    return;
                }
                if !self.commit(attempt, AuthMachineInput::UserFound) {
                    return;
                }
                match self.fetch_challenge(attempt, &address).await {
                    Some(challenge) => challenge,
                    None => return,
                }
            }
            HandshakeStep::Register(fields) => {
                match self.shared.backend.register(&address, &fields).await {
                    Ok(challenge) => {
                        if !self.commit(attempt, AuthMachineInput::ChallengeIssued) {
                            return;
                        }
                        challenge
                    }
                    Err(e) => {
                        self.fail(attempt, e.into());
                        return;
                    }
                }
            }
        };

        self.sign_and_verify(attempt, address, challenge).await;
    }

    async fn fetch_challenge(&self, attempt: u64, address: &WalletAddress) -> Option<Challenge> {
        match self.shared.backend.request_signature(address).await {
            Ok(challenge) => self
                .commit(attempt, AuthMachineInput::ChallengeIssued)
                .then_some(challenge),
            Err(e) => {
                self.fail(attempt, e.into());
                None
            }
        }
    }

    async fn sign_and_verify(&self, attempt: u64, address: WalletAddress, first: Challenge) {
        let mut challenge = first;
        loop {
            debug!(attempt, wallet_address = %address, "Requesting wallet signature");
            let signature = match self
                .shared
                .wallet
                .sign_message(challenge.message_bytes())
                .await
            {
                Ok(signature) => signature,
                Err(e) => {
                    self.fail(attempt, e.into());
                    return;
                }
            };
            if !self.commit(attempt, AuthMachineInput::MessageSigned) {
                return;
            }

            match self
                .shared
                .backend
                .verify(challenge.into_verify_request(signature))
                .await
            {
                Ok(session) => {
                    self.complete(attempt, session);
                    return;
                }
                Err(e) if e.is_stale_challenge() => {
                    if !self.refresh_challenge(attempt, &e) {
                        return;
                    }
                    challenge = match self.fetch_challenge(attempt, &address).await {
                        Some(challenge) => challenge,
                        None => return,
                    };
                }
                Err(e) => {
                    self.fail(attempt, e.into());
                    return;
                }
            }
        }
    }

    /// Apply one handshake step if its attempt is still current.
    fn commit(&self, attempt: u64, input: AuthMachineInput) -> bool {
        let mut inner = self.shared.inner.lock();
        if inner.is_stale(attempt) {
            debug!(
                attempt,
                current_attempt = inner.attempt,
                input = ?input,
                "Discarding stale handshake result"
            );
            return false;
        }

        match inner.transition(input) {
            Ok(_) => {
                self.publish(&inner);
                true
            }
            Err(e) => {
                warn!(attempt, error = %e, "Handshake step rejected");
                false
            }
        }
    }

    fn refresh_challenge(&self, attempt: u64, cause: &BackendError) -> bool {
        let mut inner = self.shared.inner.lock();
        if inner.is_stale(attempt) {
            debug!(attempt, "Discarding stale verify result");
            return false;
        }

        if inner.challenge_refreshes >= self.shared.options.max_challenge_refreshes {
            self.fail_locked(&mut inner, AuthError::StaleChallenge(cause.to_string()));
            return false;
        }

        inner.challenge_refreshes += 1;
        info!(
            attempt,
            refreshes = inner.challenge_refreshes,
            error = %cause,
            "Challenge no longer valid, requesting a new one"
        );
        match inner.transition(AuthMachineInput::ChallengeExpired) {
            Ok(_) => {
                self.publish(&inner);
                true
            }
            Err(e) => {
                warn!(attempt, error = %e, "Cannot refresh challenge");
                false
            }
        }
    }

    fn fail(&self, attempt: u64, error: AuthError) {
        let mut inner = self.shared.inner.lock();
        if inner.is_stale(attempt) {
            debug!(
                attempt,
                current_attempt = inner.attempt,
                error = %error,
                "Discarding stale handshake failure"
            );
            return;
        }
        self.fail_locked(&mut inner, error);
    }

    fn fail_locked(&self, inner: &mut Inner, error: AuthError) {
        let during_registration = inner.flow == Flow::Registration;
        warn!(
            attempt = inner.attempt,
            kind = ?error.kind(),
            error = %error,
            during_registration,
            "Authentication failed"
        );
        if let Err(e) = inner.transition(AuthMachineInput::Failure) {
            warn!(error = %e, "Cannot record failure");
            return;
        }
        inner.failure = Some(AuthFailure {
            error,
            during_registration,
        });
        self.publish(inner);
    }

    fn complete(&self, attempt: u64, session: Session) {
        let mut inner = self.shared.inner.lock();
        if inner.is_stale(attempt) {
            debug!(
                attempt,
                current_attempt = inner.attempt,
                wallet_address = %session.address(),
                "Discarding stale session"
            );
            return;
        }
        if let Err(e) = inner.transition(AuthMachineInput::Verified) {
            warn!(attempt, error = %e, "Cannot accept session");
            return;
        }

        self.persist_session(&session);
        self.persist_profile_completed();
        info!(attempt, wallet_address = %session.address(), "Authenticated");

        inner.session = Some(session);
        inner.profile_completed = true;
        inner.pending_profile = None;
        inner.failure = None;
        inner.flow = Flow::Returning;
        self.publish(&inner);
    }

    fn publish(&self, inner: &Inner) {
        self.shared.snapshots.send_replace(inner.snapshot());
    }

    fn persist_session(&self, session: &Session) {
        if let Err(e) = self.shared.store.save(session) {
            warn!(error = %e, "Failed to persist session");
        }
    }

    fn persist_profile_completed(&self) {
        if let Err(e) = self.shared.store.set_profile_completed(true) {
            warn!(error = %e, "Failed to persist profile flag");
        }
    }

    fn clear_persisted(&self) {
        if let Err(e) = self.shared.store.clear() {
            warn!(error = %e, "Failed to clear stored session");
        }
    }
}
