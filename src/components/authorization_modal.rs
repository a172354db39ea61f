//! Dialog that walks the user through signing the authorization challenge.
//!
//! The dialog is a view over an `AuthorizationModal`; whoever owns that
//! model decides what happens on success or cancel.

use leptos::prelude::*;

use crate::state::authorization_modal::{AuthorizationModal, CancelReason, ModalPhase, ModalState};
use crate::state::session::AuthSession;
use crate::util::require_auth::AuthGate;
use crate::util::signals::mirror;

fn status_line(state: &ModalState) -> &'static str {
    match state.phase {
        ModalPhase::Closed => "",
        ModalPhase::Prompt => "Sign a one-time message with your wallet to continue.",
        ModalPhase::Signing => "Waiting for your wallet to sign...",
        ModalPhase::Verifying => "Checking the signature...",
        ModalPhase::Failed => "Authorization failed. You can try again.",
    }
}

/// Modal over an `AuthorizationModal`; renders nothing while it is closed.
#[component]
pub fn AuthorizationModalView(modal: AuthorizationModal) -> impl IntoView {
    let state = mirror(&modal);

    let cancel_modal = modal.clone();
    let on_cancel = Callback::new(move |()| {
        cancel_modal.cancel(CancelReason::Dismissed);
    });
    let sign_modal = modal.clone();
    let on_sign = move |_| {
        let modal = sign_modal.clone();
        leptos::task::spawn_local(async move {
            // Failures are recorded in the modal state and shown below.
            let _ = modal.authorize().await;
        });
    };
    let on_keydown = move |ev: leptos::ev::KeyboardEvent| {
        if ev.key() == "Escape" && !state.get_untracked().is_busy() {
            ev.prevent_default();
            on_cancel.run(());
        }
    };

    let account = move || state.get().account_id.unwrap_or_default();
    let status = move || status_line(&state.get());
    let busy = move || state.get().is_busy();

    view! {
        <Show when=move || state.get().is_open()>
            <div class="authorization-modal__backdrop" on:click=move |_| on_cancel.run(())>
                <div
                    class="authorization-modal"
                    on:click=move |ev| ev.stop_propagation()
                    on:keydown=on_keydown
                    tabindex="0"
                >
                    <div class="authorization-modal__header">
                        <h2>"Authorize this session"</h2>
                    </div>
                    <p class="authorization-modal__account">{account}</p>
                    <p class="authorization-modal__status">{status}</p>
                    <Show when=move || state.get().error.is_some()>
                        <p class="authorization-modal__error">{move || state.get().error.unwrap_or_default()}</p>
                    </Show>
                    <div class="authorization-modal__actions">
                        <button class="authorization-modal__cancel" on:click=move |_| on_cancel.run(())>
                            "Cancel"
                        </button>
                        <button class="authorization-modal__sign" on:click=on_sign.clone() disabled=busy>
                            "Sign message"
                        </button>
                    </div>
                </div>
            </div>
        </Show>
    }
}

/// Prompt for an [`AuthGate`]; mount it next to the controls that call
/// `require_auth`.
#[component]
pub fn GateModal(gate: AuthGate) -> impl IntoView {
    view! { <AuthorizationModalView modal=gate.modal().clone()/> }
}

/// Gate bound to the current session. Pair with [`GateModal`].
pub fn use_require_auth() -> AuthGate {
    AuthGate::new(&expect_context::<AuthSession>())
}
