//! Push session expiry to the UI.
//!
//! `AuthorizationStore` evaluates its TTL on read, so a mirrored signal
//! would keep showing a dead grant until something else wrote to the
//! store. In the browser a timer sleeps until the grant's TTL ends and
//! then calls `expire_if_due`, which clears the grant and notifies.

use leptos::prelude::*;

use crate::state::authorization::{AuthorizationState, AuthorizationStore};

/// Schedule expiry for every grant `authorization` reports.
pub fn watch_expiry(store: AuthorizationStore, authorization: RwSignal<AuthorizationState>) {
    Effect::new(move || {
        if !authorization.with(|a| a.is_authorized) {
            return;
        }
        #[cfg(feature = "hydrate")]
        leptos::task::spawn_local(expire_when_due(store.clone()));
        #[cfg(not(feature = "hydrate"))]
        let _ = &store;
    });
}

/// Sleep until the current grant is due, then clear it. A timer that wakes
/// early goes back to sleep; one that outlived its grant just stops.
#[cfg(feature = "hydrate")]
async fn expire_when_due(store: AuthorizationStore) {
    while let Some(remaining) = store.expires_in() {
        if remaining.is_zero() {
            store.expire_if_due();
            return;
        }
        gloo_timers::future::sleep(remaining).await;
    }
}
