//! State contract of the authorization prompt.
//!
//! SYSTEM CONTEXT
//! ==============
//! Owned by one caller at a time (an `AuthGate` or a route guard). The
//! rendered dialog only calls `authorize()` and `cancel()`; the owner learns
//! the result through the outcome callback given at construction.
//!
//! DESIGN
//! ======
//! `attempt` increments on every open and close. An `authorize()` call
//! remembers the attempt it started under and discards its own completion if
//! the prompt was closed or reopened meanwhile, so a signature that arrives
//! after a cancel can never authorize anything.
//!
//! On success the grant is written to the `AuthorizationStore`, the prompt
//! closes, and only then does the owner hear `Authorized`. The prompt also
//! watches that store: a grant for its account recorded by any other prompt
//! closes it the same way, so one signature satisfies every open prompt and
//! an attempt still in flight here completes as `Superseded`.

#[cfg(test)]
#[path = "authorization_modal_test.rs"]
mod authorization_modal_test;

use std::sync::Arc;

use leptos::logging::{log, warn};

use super::authorization::AuthorizationStore;
use super::observable::{Observable, Store, Subscription};
use super::session::AuthSession;
use super::wallet::WalletStore;
use crate::error::AuthError;
use crate::net::challenge::{Challenge, ChallengeVerifier, SignedChallenge, Verdict};
use crate::util::clock::Clock;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ModalPhase {
    #[default]
    Closed,
    /// Waiting for the user to start signing.
    Prompt,
    /// Wallet is signing the challenge.
    Signing,
    /// Backend is checking the signature.
    Verifying,
    /// Last attempt failed; the user may retry or cancel.
    Failed,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModalState {
    pub phase: ModalPhase,
    pub account_id: Option<String>,
    pub attempt: u64,
    pub error: Option<String>,
}

impl ModalState {
    pub fn is_open(&self) -> bool {
        self.phase != ModalPhase::Closed
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.phase, ModalPhase::Signing | ModalPhase::Verifying)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelReason {
    /// User closed or declined the prompt.
    Dismissed,
    /// Wallet switched or dropped the account the prompt was for.
    AccountChanged,
}

impl From<CancelReason> for AuthError {
    fn from(reason: CancelReason) -> Self {
        match reason {
            CancelReason::Dismissed => Self::AuthorizationDeclined,
            CancelReason::AccountChanged => Self::Superseded,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModalOutcome {
    Authorized { account_id: String },
    Cancelled { reason: CancelReason },
}

type OutcomeHandler = Arc<dyn Fn(ModalOutcome) + Send + Sync>;

#[derive(Clone)]
pub struct AuthorizationModal {
    state: Observable<ModalState>,
    wallet: WalletStore,
    authorization: AuthorizationStore,
    verifier: Arc<dyn ChallengeVerifier>,
    clock: Arc<dyn Clock>,
    on_outcome: OutcomeHandler,
    _wallet_watch: Arc<Subscription>,
    _grant_watch: Arc<Subscription>,
}

impl AuthorizationModal {
    pub fn new(session: &AuthSession, on_outcome: impl Fn(ModalOutcome) + Send + Sync + 'static) -> Self {
        let state = Observable::new(ModalState::default());
        let on_outcome: OutcomeHandler = Arc::new(on_outcome);

        let weak = state.downgrade();
        let handler = Arc::clone(&on_outcome);
        let watch = session.wallet.subscribe(move |wallet| {
            let Some(state) = weak.upgrade() else {
                return;
            };
            let closed = state.update(|s| {
                if s.is_open() && s.account_id != wallet.account_id {
                    close(s);
                    true
                } else {
                    false
                }
            });
            if closed {
                log!("authorization prompt: closed, wallet account changed to {:?}", wallet.account_id);
                handler(ModalOutcome::Cancelled { reason: CancelReason::AccountChanged });
            }
        });

        let weak = state.downgrade();
        let handler = Arc::clone(&on_outcome);
        let grant_watch = session.authorization.subscribe_snapshot(move |auth| {
            let Some(state) = weak.upgrade() else {
                return;
            };
            let Some(account_id) = auth.authorized_account_id.as_deref().filter(|_| auth.is_authorized) else {
                return;
            };
            let closed = state.update(|s| {
                if s.is_open() && s.account_id.as_deref() == Some(account_id) {
                    close(s);
                    true
                } else {
                    false
                }
            });
            if closed {
                log!("authorization prompt: closed, {account_id} is now authorized");
                handler(ModalOutcome::Authorized { account_id: account_id.to_owned() });
            }
        });

        Self {
            state,
            wallet: session.wallet.clone(),
            authorization: session.authorization.clone(),
            verifier: Arc::clone(&session.verifier),
            clock: Arc::clone(&session.clock),
            on_outcome,
            _wallet_watch: Arc::new(watch),
            _grant_watch: Arc::new(grant_watch),
        }
    }

    /// Open the prompt for `account_id`. Returns `false` (and changes
    /// nothing) if it is already open.
    pub fn open(&self, account_id: &str) -> bool {
        let opened = self.state.update(|s| {
            if s.is_open() {
                return false;
            }
            s.phase = ModalPhase::Prompt;
            s.account_id = Some(account_id.to_owned());
            s.attempt += 1;
            s.error = None;
            true
        });
        if opened {
            log!("authorization prompt: opened for {account_id}");
        }
        opened
    }

    /// Close the prompt without authorizing. Returns `false` if it was not
    /// open. Any in-flight attempt is discarded when it completes.
    pub fn cancel(&self, reason: CancelReason) -> bool {
        let cancelled = self.state.update(|s| {
            if !s.is_open() {
                return false;
            }
            close(s);
            true
        });
        if cancelled {
            log!("authorization prompt: cancelled ({reason:?})");
            (self.on_outcome)(ModalOutcome::Cancelled { reason });
        }
        cancelled
    }

    /// Run challenge signing and verification for the prompt's account.
    ///
    /// # Errors
    ///
    /// - [`AuthError::PromptClosed`] / [`AuthError::AttemptInFlight`] if the
    ///   prompt is not waiting for the user.
    /// - [`AuthError::Superseded`] if the prompt was closed while waiting.
    /// - Provider, verification, rejection and stale-account errors; these
    ///   leave the prompt open in [`ModalPhase::Failed`].
    pub async fn authorize(&self) -> Result<(), AuthError> {
        let (attempt, account_id) = self.begin()?;

        let challenge = Challenge::new(&account_id, self.wallet.network(), self.clock.now_ms());
        let signing = match self.wallet.sign_message(&challenge.message()) {
            Ok(signing) => signing,
            Err(err) => return Err(self.fail(attempt, err)),
        };
        let signature = match signing.await {
            Ok(signature) => signature,
            Err(err) => return Err(self.fail(attempt, err.into())),
        };

        if !self.advance(attempt, ModalPhase::Verifying) {
            return Err(AuthError::Superseded);
        }
        let signed = SignedChallenge::new(challenge, signature);
        let verdict = match self.verifier.verify(&signed).await {
            Ok(verdict) => verdict,
            Err(err) => return Err(self.fail(attempt, err)),
        };
        if !self.is_current(attempt) {
            return Err(AuthError::Superseded);
        }

        match verdict {
            Verdict::Accepted => {}
            Verdict::Rejected(reason) => return Err(self.fail(attempt, AuthError::SignatureRejected(reason))),
        }
        if let Err(err) = self.authorization.set_authorized(&account_id) {
            return Err(self.fail(attempt, err));
        }

        // The grant watch normally closes the prompt and reports already; this
        // covers a write that left the store unchanged.
        let finished = self.state.update(|s| {
            if s.attempt != attempt || !s.is_open() {
                return false;
            }
            close(s);
            true
        });
        if finished {
            (self.on_outcome)(ModalOutcome::Authorized { account_id });
        }
        Ok(())
    }

    pub fn snapshot(&self) -> ModalState {
        self.state.get()
    }

    pub fn is_open(&self) -> bool {
        self.state.with(ModalState::is_open)
    }

    pub fn subscribe(&self, listener: impl Fn(&ModalState) + Send + Sync + 'static) -> Subscription {
        self.state.subscribe(listener)
    }

    fn begin(&self) -> Result<(u64, String), AuthError> {
        self.state.update(|s| match s.phase {
            ModalPhase::Closed => Err(AuthError::PromptClosed),
            ModalPhase::Signing | ModalPhase::Verifying => Err(AuthError::AttemptInFlight),
            ModalPhase::Prompt | ModalPhase::Failed => {
                let account_id = s.account_id.clone().ok_or(AuthError::NotConnected)?;
                s.phase = ModalPhase::Signing;
                s.error = None;
                Ok((s.attempt, account_id))
            }
        })
    }

    fn is_current(&self, attempt: u64) -> bool {
        self.state.with(|s| s.attempt == attempt && s.is_open())
    }

    fn advance(&self, attempt: u64, phase: ModalPhase) -> bool {
        self.state.update(|s| {
            if s.attempt != attempt || !s.is_open() {
                return false;
            }
            s.phase = phase;
            true
        })
    }

    /// Record a failure for `attempt`. A superseded attempt reports
    /// `Superseded` instead and leaves the prompt alone.
    fn fail(&self, attempt: u64, err: AuthError) -> AuthError {
        let recorded = self.state.update(|s| {
            if s.attempt != attempt || !s.is_open() {
                return false;
            }
            s.phase = ModalPhase::Failed;
            s.error = Some(err.to_string());
            true
        });
        if recorded {
            warn!("authorization prompt: attempt {attempt} failed: {err}");
            err
        } else {
            AuthError::Superseded
        }
    }
}

fn close(state: &mut ModalState) {
    state.phase = ModalPhase::Closed;
    state.account_id = None;
    state.attempt += 1;
    state.error = None;
}

impl Store for AuthorizationModal {
    type Snapshot = ModalState;

    fn snapshot(&self) -> ModalState {
        AuthorizationModal::snapshot(self)
    }

    fn subscribe_snapshot(&self, listener: impl Fn(&ModalState) + Send + Sync + 'static) -> Subscription {
        self.subscribe(listener)
    }
}
