//! Account page; only mounted behind the wallet-connection guard.

use leptos::prelude::*;

use crate::state::authorization::AuthorizationState;
use crate::state::session::AuthSession;
use crate::state::wallet::WalletSession;

#[component]
pub fn ProfilePage() -> impl IntoView {
    let session = expect_context::<AuthSession>();
    let wallet = expect_context::<RwSignal<WalletSession>>();
    let authorization = expect_context::<RwSignal<AuthorizationState>>();

    let account = move || wallet.get().account_id.unwrap_or_else(|| "—".to_owned());
    let network = move || wallet.get().network_id.to_string();
    let authorized = move || {
        let state = authorization.get();
        match (state.is_authorized, state.authorized_at_ms) {
            (true, Some(at)) => format!("Authorized (signed at {at})"),
            (true, None) => "Authorized".to_owned(),
            (false, _) => "Not authorized".to_owned(),
        }
    };
    let revoke_session = session.clone();
    let on_revoke = move |_| revoke_session.authorization.clear();
    let on_logout = move |_| session.logout();

    view! {
        <section class="profile-page">
            <h1>"Profile"</h1>
            <dl class="profile-page__fields">
                <dt>"Account"</dt>
                <dd>{account}</dd>
                <dt>"Network"</dt>
                <dd>{network}</dd>
                <dt>"Authorization"</dt>
                <dd>{authorized}</dd>
            </dl>
            <div class="profile-page__actions">
                <button on:click=on_revoke>"Revoke authorization"</button>
                <button on:click=on_logout>"Log out"</button>
            </div>
        </section>
    }
}
