//! Challenge-signing authorization for the connected account.
//!
//! SYSTEM CONTEXT
//! ==============
//! Connection says which account the wallet reports; authorization says that
//! account proved key control by signing a challenge the backend accepted.
//! `require_auth` and the route guards both read this store.
//!
//! DESIGN
//! ======
//! A grant belongs to exactly one account. The store watches the wallet and
//! clears itself synchronously when the connected account differs from the
//! authorized one, before any other reader re-renders. `snapshot()` also
//! compares against the live wallet account and the session TTL, so even a
//! reader running mid-notification never sees a stale grant.

#[cfg(test)]
#[path = "authorization_test.rs"]
mod authorization_test;

use std::sync::Arc;
use std::time::Duration;

use leptos::logging::log;

use super::observable::{Observable, Store, Subscription};
use super::wallet::WalletStore;
use crate::error::AuthError;
use crate::util::clock::Clock;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthorizationState {
    pub is_authorized: bool,
    pub authorized_account_id: Option<String>,
    /// When the grant was recorded, in epoch milliseconds.
    pub authorized_at_ms: Option<u64>,
}

/// Grant validity rules: right account, not expired.
#[derive(Clone)]
struct Validity {
    wallet: WalletStore,
    clock: Arc<dyn Clock>,
    ttl: Option<Duration>,
}

impl Validity {
    fn is_valid(&self, raw: &AuthorizationState, account_id: Option<&str>) -> bool {
        raw.is_authorized
            && account_id.is_some()
            && raw.authorized_account_id.as_deref() == account_id
            && !self.is_expired(raw)
    }

    fn is_expired(&self, raw: &AuthorizationState) -> bool {
        let (Some(ttl), Some(at)) = (self.ttl, raw.authorized_at_ms) else {
            return false;
        };
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        self.clock.now_ms().saturating_sub(at) >= ttl_ms
    }

    fn remaining(&self, raw: &AuthorizationState) -> Option<Duration> {
        let (true, Some(ttl), Some(at)) = (raw.is_authorized, self.ttl, raw.authorized_at_ms) else {
            return None;
        };
        let elapsed = Duration::from_millis(self.clock.now_ms().saturating_sub(at));
        Some(ttl.saturating_sub(elapsed))
    }

    fn effective(&self, raw: &AuthorizationState) -> AuthorizationState {
        if self.is_valid(raw, self.wallet.account_id().as_deref()) {
            raw.clone()
        } else {
            AuthorizationState::default()
        }
    }
}

#[derive(Clone)]
pub struct AuthorizationStore {
    state: Observable<AuthorizationState>,
    validity: Validity,
    _wallet_watch: Arc<Subscription>,
}

impl AuthorizationStore {
    pub fn new(wallet: WalletStore, clock: Arc<dyn Clock>, ttl: Option<Duration>) -> Self {
        let state = Observable::new(AuthorizationState::default());

        let weak = state.downgrade();
        let watch = wallet.subscribe(move |session| {
            let Some(state) = weak.upgrade() else {
                return;
            };
            state.update(|auth| {
                if auth.is_authorized && auth.authorized_account_id != session.account_id {
                    log!(
                        "authorization: cleared grant for {:?}, wallet now reports {:?}",
                        auth.authorized_account_id,
                        session.account_id
                    );
                    *auth = AuthorizationState::default();
                }
            });
        });

        Self { state, validity: Validity { wallet, clock, ttl }, _wallet_watch: Arc::new(watch) }
    }

    /// Record a grant for `account_id`.
    ///
    /// Call only after the backend accepted a challenge signed by that
    /// account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::StaleAccount`] if the wallet no longer reports
    /// `account_id` as connected; the grant is not recorded.
    pub fn set_authorized(&self, account_id: &str) -> Result<(), AuthError> {
        let connected = self.validity.wallet.account_id();
        if connected.as_deref() != Some(account_id) {
            return Err(AuthError::StaleAccount { expected: account_id.to_owned(), actual: connected });
        }
        let now = self.validity.clock.now_ms();
        self.state.set(AuthorizationState {
            is_authorized: true,
            authorized_account_id: Some(account_id.to_owned()),
            authorized_at_ms: Some(now),
        });
        log!("authorization: granted for {account_id}");
        Ok(())
    }

    /// Drop any grant (logout, disconnect, expiry).
    pub fn clear(&self) {
        self.state.update(|auth| {
            if *auth != AuthorizationState::default() {
                log!("authorization: cleared for {:?}", auth.authorized_account_id);
                *auth = AuthorizationState::default();
            }
        });
    }

    /// Effective state: a grant that expired or belongs to another account
    /// reads as unauthorized.
    pub fn snapshot(&self) -> AuthorizationState {
        self.validity.effective(&self.state.get())
    }

    pub fn is_authorized_for(&self, account_id: &str) -> bool {
        self.validity.wallet.account_id().as_deref() == Some(account_id)
            && self.state.with(|raw| self.validity.is_valid(raw, Some(account_id)))
    }

    /// Like [`Self::is_authorized_for`], but a grant that is no longer valid
    /// is cleared so observers learn about it.
    pub fn ensure_authorized_for(&self, account_id: &str) -> bool {
        if self.is_authorized_for(account_id) {
            return true;
        }
        self.clear();
        false
    }

    /// Time left on the current grant; `None` without a grant or a TTL.
    pub fn expires_in(&self) -> Option<Duration> {
        self.state.with(|raw| self.validity.remaining(raw))
    }

    /// Clear the grant if its TTL has run out. Expiry is otherwise only
    /// noticed on read, so this is what pushes it to subscribers.
    pub fn expire_if_due(&self) -> bool {
        let due = self.state.with(|raw| raw.is_authorized && self.validity.is_expired(raw));
        if due {
            log!("authorization: session expired");
            self.clear();
        }
        due
    }

    pub fn subscribe(&self, listener: impl Fn(&AuthorizationState) + Send + Sync + 'static) -> Subscription {
        self.state.subscribe(listener)
    }
}

impl Store for AuthorizationStore {
    type Snapshot = AuthorizationState;

    fn snapshot(&self) -> AuthorizationState {
        AuthorizationStore::snapshot(self)
    }

    /// Listeners receive the effective state, not the raw cell.
    fn subscribe_snapshot(&self, listener: impl Fn(&AuthorizationState) + Send + Sync + 'static) -> Subscription {
        let validity = self.validity.clone();
        self.subscribe(move |raw| listener(&validity.effective(raw)))
    }
}
