//! Landing page: wallet status, connect/disconnect, and a gated action.
//!
//! SYSTEM CONTEXT
//! ==============
//! Public route and the redirect target for every guard. The "Like" button
//! shows the imperative gate: it runs only for an authorized account and
//! is replayed once after a successful prompt.

use leptos::prelude::*;
use leptos_router::components::A;

use crate::components::authorization_modal::{GateModal, use_require_auth};
use crate::state::authorization::AuthorizationState;
use crate::state::session::AuthSession;
use crate::state::wallet::WalletSession;

fn wallet_label(wallet: &WalletSession) -> String {
    match (&wallet.account_id, wallet.ready) {
        (Some(account), _) => format!("Connected as {account} on {}", wallet.network_id),
        (None, false) => "Looking for your wallet...".to_owned(),
        (None, true) => "No wallet connected.".to_owned(),
    }
}

#[component]
pub fn HomePage() -> impl IntoView {
    let session = expect_context::<AuthSession>();
    let wallet = expect_context::<RwSignal<WalletSession>>();
    let authorization = expect_context::<RwSignal<AuthorizationState>>();
    let gate = use_require_auth();
    let likes = RwSignal::new(0_u32);

    let connect_session = session.clone();
    let on_connect = move |_| connect_session.start();
    let on_logout = move |_| session.logout();
    let like_gate = gate.clone();
    let on_like = move |_| {
        like_gate.require_auth(move || likes.update(|n| *n += 1));
    };

    let connected = move || wallet.get().is_connected();
    let label = move || wallet_label(&wallet.get());
    let auth_label = move || {
        if authorization.get().is_authorized { "Session authorized." } else { "Session not authorized." }
    };

    view! {
        <section class="home-page">
            <h1>"Crosspost"</h1>
            <p class="home-page__wallet">{label}</p>
            <p class="home-page__auth">{auth_label}</p>
            <div class="home-page__actions">
                <Show
                    when=connected
                    fallback=move || view! { <button class="home-page__connect" on:click=on_connect.clone()>"Connect wallet"</button> }
                >
                    <button class="home-page__logout" on:click=on_logout.clone()>"Log out"</button>
                </Show>
                <button class="home-page__like" on:click=on_like>
                    {move || format!("Like ({})", likes.get())}
                </button>
            </div>
            <nav class="home-page__nav">
                <A href="/profile">"Profile"</A>
                <A href="/compose">"Compose"</A>
            </nav>
            <GateModal gate/>
        </section>
    }
}
