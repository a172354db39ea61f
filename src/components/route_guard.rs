//! Route wrappers that enforce wallet connection and authorization.
//!
//! SYSTEM CONTEXT
//! ==============
//! Routes in `app` wrap their page in one of these. The decision logic
//! lives in `util::guards::RouteVisit`; this module only feeds it store
//! snapshots and acts on the status it reports.
//!
//! DESIGN
//! ======
//! - `Blocked` navigates with `replace` so the protected URL does not stay
//!   in history.
//! - `AwaitingAuthorization` mounts a route-owned prompt instead of the
//!   page. Success re-checks in place; dismissal leaves for home.
//! - Nothing is decided until the wallet provider has reported once, so a
//!   returning user is not bounced home during start-up.

use leptos::prelude::*;
use leptos_router::NavigateOptions;
use leptos_router::hooks::use_navigate;

use crate::components::authorization_modal::AuthorizationModalView;
use crate::state::authorization::AuthorizationState;
use crate::state::authorization_modal::{AuthorizationModal, CancelReason, ModalOutcome};
use crate::state::session::AuthSession;
use crate::state::wallet::WalletSession;
use crate::util::guards::{Guard, GuardContext, RouteStatus, RouteVisit};

/// Render `children` only while every guard in `guards` allows it.
#[component]
pub fn RouteGuard(guards: Vec<Guard>, children: ChildrenFn) -> impl IntoView {
    let session = expect_context::<AuthSession>();
    let wallet = expect_context::<RwSignal<WalletSession>>();
    let authorization = expect_context::<RwSignal<AuthorizationState>>();
    let navigate = use_navigate();

    let home = session.config.home_route.clone();
    let visit = RwSignal::new(RouteVisit::new(guards, home.clone()));

    let stores = session.clone();
    let modal = AuthorizationModal::new(&session, move |outcome| {
        let wallet = stores.wallet.snapshot();
        let authorization = stores.authorization.snapshot();
        let home = stores.config.home_route.as_str();
        let _ = visit.try_update(|v| match outcome {
            ModalOutcome::Authorized { .. } => {
                v.authorization_succeeded(&GuardContext::new(&wallet, &authorization, home));
            }
            ModalOutcome::Cancelled { reason: CancelReason::Dismissed } => {
                v.authorization_cancelled();
            }
            // The visit re-enters for the new account on its own.
            ModalOutcome::Cancelled { reason: CancelReason::AccountChanged } => {}
        });
    });

    Effect::new(move || {
        let wallet = wallet.get();
        let authorization = authorization.get();
        if !wallet.ready {
            return;
        }
        visit.update(|v| {
            v.observe(&GuardContext::new(&wallet, &authorization, &home));
        });
    });

    let prompt = modal.clone();
    Effect::new(move || match visit.with(|v| v.status().clone()) {
        RouteStatus::Blocked { redirect } => {
            navigate(&redirect, NavigateOptions { replace: true, ..NavigateOptions::default() });
        }
        RouteStatus::AwaitingAuthorization => {
            if let Some(account_id) = wallet.get_untracked().account_id {
                prompt.open(&account_id);
            }
        }
        RouteStatus::Rendered => {
            if prompt.is_open() {
                prompt.cancel(CancelReason::Dismissed);
            }
        }
        RouteStatus::Entering => {}
    });

    move || match visit.with(|v| v.status().clone()) {
        RouteStatus::Rendered => children().into_any(),
        RouteStatus::AwaitingAuthorization => view! { <AuthorizationModalView modal=modal.clone()/> }.into_any(),
        RouteStatus::Entering | RouteStatus::Blocked { .. } => {
            view! { <p class="route-guard__pending">"Checking wallet..."</p> }.into_any()
        }
    }
}

/// Redirect home unless a wallet account is connected.
#[component]
pub fn RequireWalletConnection(children: ChildrenFn) -> impl IntoView {
    view! { <RouteGuard guards=vec![Guard::RequireWalletConnection]>{children()}</RouteGuard> }
}

/// Show the authorization prompt in place of the page until the connected
/// account is authorized.
#[component]
pub fn RequireAuthorization(children: ChildrenFn) -> impl IntoView {
    view! { <RouteGuard guards=vec![Guard::RequireAuthorization]>{children()}</RouteGuard> }
}
