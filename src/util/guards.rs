//! Route guards as pure functions plus the per-visit state machine.
//!
//! SYSTEM CONTEXT
//! ==============
//! Protected routes declare guards; the guard components in
//! `components::route_guard` feed store snapshots through here and act on
//! the result. Nothing in this module touches Leptos, so every decision is
//! unit-testable.
//!
//! DESIGN
//! ======
//! Guard failure is a value (`GuardResult`), not a panic or error. A
//! redirect is ordinary control flow for the router.
//!
//! Per visit: `Entering -> Blocked | AwaitingAuthorization | Rendered`,
//! `AwaitingAuthorization -> Rendered` on success, `-> Blocked` on cancel.
//! An account change re-enters the visit so stale content never stays up.

#[cfg(test)]
#[path = "guards_test.rs"]
mod guards_test;

use leptos::logging::log;

use crate::state::authorization::AuthorizationState;
use crate::state::wallet::WalletSession;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Guard {
    RequireWalletConnection,
    RequireAuthorization,
}

/// What to mount in place of a route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Blocker {
    AuthorizationModal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardResult {
    Allow,
    RedirectTo(String),
    RenderInstead(Blocker),
}

#[derive(Clone, Copy, Debug)]
pub struct GuardContext<'a> {
    pub wallet: &'a WalletSession,
    pub authorization: &'a AuthorizationState,
    pub home_route: &'a str,
}

impl<'a> GuardContext<'a> {
    pub fn new(wallet: &'a WalletSession, authorization: &'a AuthorizationState, home_route: &'a str) -> Self {
        Self { wallet, authorization, home_route }
    }

    fn authorized(&self) -> bool {
        self.authorization.is_authorized
            && self.wallet.account_id.is_some()
            && self.authorization.authorized_account_id == self.wallet.account_id
    }
}

/// Hard gate: no account, no route.
pub fn require_wallet_connection(ctx: &GuardContext<'_>) -> GuardResult {
    if ctx.wallet.is_connected() {
        GuardResult::Allow
    } else {
        GuardResult::RedirectTo(ctx.home_route.to_owned())
    }
}

/// Prompt in place of the route until the account is authorized.
///
/// Authorization needs an account to sign with, so a disconnected visitor
/// is redirected home like the connection guard does.
pub fn require_authorization(ctx: &GuardContext<'_>) -> GuardResult {
    if !ctx.wallet.is_connected() {
        return GuardResult::RedirectTo(ctx.home_route.to_owned());
    }
    if ctx.authorized() {
        GuardResult::Allow
    } else {
        GuardResult::RenderInstead(Blocker::AuthorizationModal)
    }
}

impl Guard {
    pub fn check(self, ctx: &GuardContext<'_>) -> GuardResult {
        match self {
            Self::RequireWalletConnection => require_wallet_connection(ctx),
            Self::RequireAuthorization => require_authorization(ctx),
        }
    }
}

/// Run guards in order; the first that does not allow decides.
pub fn evaluate(guards: &[Guard], ctx: &GuardContext<'_>) -> GuardResult {
    guards
        .iter()
        .map(|guard| guard.check(ctx))
        .find(|result| *result != GuardResult::Allow)
        .unwrap_or(GuardResult::Allow)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RouteStatus {
    #[default]
    Entering,
    Blocked {
        redirect: String,
    },
    AwaitingAuthorization,
    Rendered,
}

/// Guard state for one navigation to a protected route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteVisit {
    guards: Vec<Guard>,
    home_route: String,
    status: RouteStatus,
    entered_account: Option<String>,
    entries: u32,
}

impl RouteVisit {
    pub fn new(guards: Vec<Guard>, home_route: impl Into<String>) -> Self {
        Self {
            guards,
            home_route: home_route.into(),
            status: RouteStatus::Entering,
            entered_account: None,
            entries: 0,
        }
    }

    pub fn status(&self) -> &RouteStatus {
        &self.status
    }

    /// Number of times guards ran from `Entering`.
    pub fn entries(&self) -> u32 {
        self.entries
    }

    /// Feed the current store snapshots.
    ///
    /// Re-enters on first sight or when the account changed; otherwise
    /// re-checks so a lost grant takes the content down. `Blocked` is final:
    /// the router is already leaving.
    pub fn observe(&mut self, ctx: &GuardContext<'_>) -> &RouteStatus {
        if matches!(self.status, RouteStatus::Blocked { .. }) {
            return &self.status;
        }
        if self.status == RouteStatus::Entering || self.entered_account != ctx.wallet.account_id {
            self.enter(ctx);
        } else {
            self.apply(evaluate(&self.guards, ctx));
        }
        &self.status
    }

    /// The prompt succeeded: re-check without a new navigation.
    pub fn authorization_succeeded(&mut self, ctx: &GuardContext<'_>) -> &RouteStatus {
        if self.status == RouteStatus::AwaitingAuthorization {
            self.apply(evaluate(&self.guards, ctx));
        }
        &self.status
    }

    /// The prompt was cancelled: leave for home.
    pub fn authorization_cancelled(&mut self) -> &RouteStatus {
        if self.status == RouteStatus::AwaitingAuthorization {
            log!("route guard: authorization cancelled, redirecting to {}", self.home_route);
            self.status = RouteStatus::Blocked { redirect: self.home_route.clone() };
        }
        &self.status
    }

    fn enter(&mut self, ctx: &GuardContext<'_>) {
        self.status = RouteStatus::Entering;
        self.entered_account.clone_from(&ctx.wallet.account_id);
        self.entries += 1;
        self.apply(evaluate(&self.guards, ctx));
    }

    fn apply(&mut self, result: GuardResult) {
        self.status = match result {
            GuardResult::Allow => RouteStatus::Rendered,
            GuardResult::RedirectTo(redirect) => {
                log!("route guard: redirecting to {redirect}");
                RouteStatus::Blocked { redirect }
            }
            GuardResult::RenderInstead(Blocker::AuthorizationModal) => RouteStatus::AwaitingAuthorization,
        };
    }
}
