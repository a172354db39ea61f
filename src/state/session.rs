//! Composition root for the wallet session gate.
//!
//! One `AuthSession` per app instance, provided through Leptos context.
//! Tests build isolated instances with fake providers instead of sharing
//! globals.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::{Arc, Mutex};

use super::authorization::AuthorizationStore;
use super::notices::{NoticeKind, Notices};
use super::observable::{Subscription, lock};
use super::wallet::WalletStore;
use crate::config::GateConfig;
use crate::net::challenge::{ChallengeVerifier, HttpChallengeVerifier};
use crate::net::wallet_provider::{self, WalletProvider};
use crate::util::clock::{Clock, SystemClock};

#[derive(Clone)]
pub struct AuthSession {
    pub config: GateConfig,
    pub wallet: WalletStore,
    pub authorization: AuthorizationStore,
    pub notices: Notices,
    pub verifier: Arc<dyn ChallengeVerifier>,
    pub clock: Arc<dyn Clock>,
    _provider_watch: Arc<Subscription>,
}

impl AuthSession {
    pub fn new(
        config: GateConfig,
        provider: Arc<dyn WalletProvider>,
        verifier: Arc<dyn ChallengeVerifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let wallet = WalletStore::new(provider, config.network);
        let authorization = AuthorizationStore::new(wallet.clone(), Arc::clone(&clock), config.session_ttl);
        let notices = Notices::default();
        let provider_watch = report_provider_failures(&wallet, &notices);
        Self { config, wallet, authorization, notices, verifier, clock, _provider_watch: Arc::new(provider_watch) }
    }

    /// Session wired to the build target's wallet provider, the HTTP
    /// verifier, and the system clock.
    pub fn for_browser(config: GateConfig) -> Self {
        let verifier = Arc::new(HttpChallengeVerifier::new(config.verify_endpoint.clone()));
        Self::new(config, wallet_provider::default_provider(), verifier, Arc::new(SystemClock))
    }

    /// Connect to the configured network (mount-time probe).
    pub fn start(&self) {
        self.wallet.connect(self.config.network);
    }

    /// Explicit logout: drop authorization and sign out of the wallet.
    pub fn logout(&self) {
        self.authorization.clear();
        self.wallet.disconnect();
    }
}

/// Turn each new provider failure into an error notice.
fn report_provider_failures(wallet: &WalletStore, notices: &Notices) -> Subscription {
    let notices = notices.clone();
    let last = Mutex::new(None::<String>);
    wallet.subscribe(move |session| {
        {
            let mut last = lock(&last);
            if session.provider_error == *last {
                return;
            }
            last.clone_from(&session.provider_error);
        }
        if let Some(err) = &session.provider_error {
            notices.push(NoticeKind::Error, format!("Wallet unavailable: {err}. Try connecting again."));
        }
    })
}
