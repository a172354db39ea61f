//! Deferred-action gate behind `require_auth`.
//!
//! SYSTEM CONTEXT
//! ==============
//! Buttons and other imperative call sites wrap protected work in
//! `require_auth`. The action runs now if the wallet is connected and
//! authorized; otherwise it is parked until the authorization prompt
//! succeeds, or dropped if the prompt is cancelled.
//!
//! TRADE-OFFS
//! ==========
//! The pending slot holds one action: a second call while the prompt is open
//! replaces the first (last caller wins) and the open prompt is reused.
//! Callers must read `false` as "not run yet, maybe never".

#[cfg(test)]
#[path = "require_auth_test.rs"]
mod require_auth_test;

use std::sync::{Arc, Mutex};

use leptos::logging::{debug_warn, log};

use crate::error::AuthError;
use crate::state::authorization_modal::{AuthorizationModal, ModalOutcome};
use crate::state::notices::{CONNECT_WALLET_NOTICE, NoticeKind};
use crate::state::observable::lock;
use crate::state::session::AuthSession;

/// Result of a gated action, folded into `require_auth`'s boolean.
pub trait ActionResult {
    fn succeeded(self) -> bool;
}

impl ActionResult for () {
    fn succeeded(self) -> bool {
        true
    }
}

impl ActionResult for bool {
    fn succeeded(self) -> bool {
        self
    }
}

impl<T, E> ActionResult for Result<T, E> {
    fn succeeded(self) -> bool {
        self.is_ok()
    }
}

/// Caller work parked until authorization completes.
pub struct PendingAction {
    callback: Box<dyn FnOnce() + Send>,
}

impl PendingAction {
    fn new<F, R>(action: F) -> Self
    where
        F: FnOnce() -> R + Send + 'static,
        R: ActionResult,
    {
        Self {
            callback: Box::new(move || {
                let ok = action().succeeded();
                log!("require_auth: deferred action finished (ok={ok})");
            }),
        }
    }

    fn run(self) {
        (self.callback)();
    }
}

type PendingSlot = Arc<Mutex<Option<PendingAction>>>;

/// One gate per call site; owns its own prompt and pending slot.
#[derive(Clone)]
pub struct AuthGate {
    session: AuthSession,
    modal: AuthorizationModal,
    pending: PendingSlot,
}

impl AuthGate {
    pub fn new(session: &AuthSession) -> Self {
        let pending: PendingSlot = Arc::new(Mutex::new(None));

        let slot = Arc::downgrade(&pending);
        let modal = AuthorizationModal::new(session, move |outcome| {
            let Some(slot) = slot.upgrade() else {
                return;
            };
            // Take the action out before running it so it may call back into the gate.
            let action = lock(&slot).take();
            match (outcome, action) {
                (ModalOutcome::Authorized { account_id }, Some(action)) => {
                    log!("require_auth: replaying deferred action for {account_id}");
                    action.run();
                }
                (ModalOutcome::Cancelled { reason }, Some(_dropped)) => {
                    log!("require_auth: dropped deferred action: {}", AuthError::from(reason));
                }
                (_, None) => {}
            }
        });

        Self { session: session.clone(), modal, pending }
    }

    /// Run `action` now if the wallet is connected and authorized.
    ///
    /// - Disconnected: posts a "connect a wallet" notice and returns
    ///   `false`; no prompt opens.
    /// - Connected but unauthorized: parks `action` (replacing any earlier
    ///   one), opens the prompt if it is not already open, returns `false`.
    /// - Authorized: runs `action` and returns its result.
    pub fn require_auth<F, R>(&self, action: F) -> bool
    where
        F: FnOnce() -> R + Send + 'static,
        R: ActionResult,
    {
        let Some(account_id) = self.session.wallet.account_id() else {
            self.session.notices.push(NoticeKind::Warning, CONNECT_WALLET_NOTICE);
            return false;
        };

        if self.session.authorization.ensure_authorized_for(&account_id) {
            return action().succeeded();
        }

        log!("require_auth: {}; deferring action", AuthError::NotAuthorized { account_id: account_id.clone() });
        let replaced = lock(&self.pending).replace(PendingAction::new(action)).is_some();
        if replaced {
            debug_warn!("require_auth: replaced an earlier deferred action");
        }
        if !self.modal.open(&account_id) {
            debug_warn!("require_auth: authorization prompt already open");
        }
        false
    }

    pub fn has_pending(&self) -> bool {
        lock(&self.pending).is_some()
    }

    /// Prompt the caller must render.
    pub fn modal(&self) -> &AuthorizationModal {
        &self.modal
    }
}
