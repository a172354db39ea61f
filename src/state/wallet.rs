//! Wallet connection state for the current browser session.
//!
//! SYSTEM CONTEXT
//! ==============
//! Route guards, the authorization store, and `require_auth` read the
//! connected account from here. This store is the only owner of the live
//! wallet handle; everyone else goes through its methods.
//!
//! DESIGN
//! ======
//! Each started handle gets an epoch. Provider callbacks carry the epoch
//! they were created with and are ignored once that handle is released, so
//! a late callback from a torn-down handle can never overwrite the account
//! reported by its replacement.

#[cfg(test)]
#[path = "wallet_test.rs"]
mod wallet_test;

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use leptos::logging::{log, warn};
use serde::{Deserialize, Serialize};

use super::observable::{Observable, Store, Subscription, lock};
use crate::error::{AuthError, ConfigError, ProviderError};
use crate::net::wallet_provider::{AccountListener, SignFuture, WalletHandle, WalletProvider};

/// Chain network the wallet targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    Mainnet,
    #[default]
    Testnet,
}

impl NetworkId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
        }
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "main" => Ok(Self::Mainnet),
            "testnet" | "test" => Ok(Self::Testnet),
            _ => Err(ConfigError::UnknownNetwork(s.to_owned())),
        }
    }
}

/// Snapshot of the wallet connection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WalletSession {
    /// Active account; `None` means disconnected.
    pub account_id: Option<String>,
    pub network_id: NetworkId,
    /// The provider has reported at least once for the current handle.
    pub ready: bool,
    /// Last provider failure, shown as a retry affordance.
    pub provider_error: Option<String>,
}

impl WalletSession {
    pub fn is_connected(&self) -> bool {
        self.account_id.is_some()
    }
}

struct LiveHandle {
    network: NetworkId,
    epoch: u64,
    handle: Box<dyn WalletHandle>,
}

/// Owner of the wallet connection and its provider handle.
#[derive(Clone)]
pub struct WalletStore {
    session: Observable<WalletSession>,
    provider: Arc<dyn WalletProvider>,
    live: Arc<Mutex<Option<LiveHandle>>>,
    epoch: Arc<AtomicU64>,
}

impl WalletStore {
    pub fn new(provider: Arc<dyn WalletProvider>, network: NetworkId) -> Self {
        Self {
            session: Observable::new(WalletSession { network_id: network, ..WalletSession::default() }),
            provider,
            live: Arc::new(Mutex::new(None)),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start (or reuse) a provider handle for `network`.
    ///
    /// Idempotent per network: with a live handle and an account this does
    /// nothing; with a live handle but no account it re-opens the provider's
    /// account picker. A different network releases the old handle before
    /// the new one is started. Provider failures leave the session
    /// disconnected with `provider_error` set.
    pub fn connect(&self, network: NetworkId) {
        // Take the handle out so provider calls never run under our lock.
        let reusable = {
            let mut live = lock(&self.live);
            if live.as_ref().is_some_and(|l| l.network == network) { live.take() } else { None }
        };
        if let Some(current) = reusable {
            if !self.session.with(WalletSession::is_connected) {
                log!("wallet: re-requesting sign-in on {network}");
                current.handle.request_sign_in();
            }
            let mut live = lock(&self.live);
            if live.is_none() && self.epoch.load(Ordering::SeqCst) == current.epoch {
                *live = Some(current);
            }
            return;
        }

        self.release();
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.session.set(WalletSession { network_id: network, ..WalletSession::default() });

        log!("wallet: starting provider on {network} (epoch {epoch})");
        match self.provider.start_up(network, self.account_listener(epoch)) {
            Ok(handle) => {
                if self.epoch.load(Ordering::SeqCst) != epoch {
                    // Released or replaced from inside a provider callback.
                    warn!("wallet: discarding handle for superseded epoch {epoch}");
                    return;
                }
                *lock(&self.live) = Some(LiveHandle { network, epoch, handle });
            }
            Err(err) => self.fail(epoch, &err),
        }
    }

    /// Sign out of the provider and release the handle.
    pub fn disconnect(&self) {
        let taken = self.take_live();
        if let Some(mut live) = taken {
            live.handle.sign_out();
            log!("wallet: signed out (epoch {})", live.epoch);
        }
        self.session.update(|s| {
            s.account_id = None;
            s.ready = true;
            s.provider_error = None;
        });
    }

    /// Release the handle without signing out (unmount, network change).
    pub fn release(&self) {
        let taken = self.take_live();
        if let Some(live) = taken {
            log!("wallet: released handle (epoch {})", live.epoch);
            drop(live);
        }
        self.session.update(|s| {
            s.account_id = None;
            s.ready = false;
        });
    }

    pub fn snapshot(&self) -> WalletSession {
        self.session.get()
    }

    pub fn account_id(&self) -> Option<String> {
        self.session.with(|s| s.account_id.clone())
    }

    pub fn network(&self) -> NetworkId {
        self.session.with(|s| s.network_id)
    }

    pub fn has_live_handle(&self) -> bool {
        lock(&self.live).is_some()
    }

    /// Ask the live handle to sign `message`. The returned future holds no
    /// lock on the store.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotConnected`] when there is no handle or no
    /// connected account.
    pub fn sign_message(&self, message: &str) -> Result<SignFuture, AuthError> {
        if !self.session.with(WalletSession::is_connected) {
            return Err(AuthError::NotConnected);
        }
        lock(&self.live)
            .as_ref()
            .map(|live| live.handle.sign_message(message))
            .ok_or(AuthError::NotConnected)
    }

    pub fn subscribe(&self, listener: impl Fn(&WalletSession) + Send + Sync + 'static) -> Subscription {
        self.session.subscribe(listener)
    }

    fn take_live(&self) -> Option<LiveHandle> {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        lock(&self.live).take()
    }

    fn account_listener(&self, epoch: u64) -> AccountListener {
        let session = self.session.downgrade();
        let current = Arc::downgrade(&self.epoch);
        Arc::new(move |account: Option<String>| {
            let (Some(session), Some(current)) = (session.upgrade(), current.upgrade()) else {
                return;
            };
            if current.load(Ordering::SeqCst) != epoch {
                warn!("wallet: ignoring account change from released epoch {epoch}");
                return;
            }
            let account = account.map(|a| a.trim().to_owned()).filter(|a| !a.is_empty());
            log!("wallet: account changed to {account:?}");
            session.update(|s| {
                s.account_id = account;
                s.ready = true;
                s.provider_error = None;
            });
        })
    }

    fn fail(&self, epoch: u64, err: &ProviderError) {
        warn!("wallet: provider failed (epoch {epoch}): {err}");
        self.session.update(|s| {
            s.account_id = None;
            s.ready = true;
            s.provider_error = Some(err.to_string());
        });
    }
}

impl Store for WalletStore {
    type Snapshot = WalletSession;

    fn snapshot(&self) -> WalletSession {
        WalletStore::snapshot(self)
    }

    fn subscribe_snapshot(&self, listener: impl Fn(&WalletSession) + Send + Sync + 'static) -> Subscription {
        self.subscribe(listener)
    }
}
