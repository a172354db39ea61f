//! Post composer; mounted behind both guards.
//!
//! The route guard already required authorization, but a grant can expire
//! while the page is open, so publishing goes through the gate as well.
//!
//! The gate, the draft, and the published list live in `ComposeRoute`,
//! above the guards. When a lost grant makes the guard swap the page for
//! its prompt, the parked publish survives and replays once that prompt
//! signs.

use leptos::prelude::*;

use crate::components::authorization_modal::{GateModal, use_require_auth};
use crate::components::route_guard::{RequireAuthorization, RequireWalletConnection};
use crate::state::authorization_modal::CancelReason;
use crate::util::require_auth::AuthGate;

#[derive(Clone)]
struct ComposeState {
    gate: AuthGate,
    draft: RwSignal<String>,
    posts: RwSignal<Vec<String>>,
}

/// `/compose`: owns the composer state and wraps the page in its guards.
#[component]
pub fn ComposeRoute() -> impl IntoView {
    let gate = use_require_auth();
    provide_context(ComposeState {
        gate: gate.clone(),
        draft: RwSignal::new(String::new()),
        posts: RwSignal::new(Vec::new()),
    });

    // Leaving the route declines whatever is still parked.
    on_cleanup(move || {
        gate.modal().cancel(CancelReason::Dismissed);
    });

    view! {
        <RequireWalletConnection>
            <RequireAuthorization>
                <ComposePage/>
            </RequireAuthorization>
        </RequireWalletConnection>
    }
}

#[component]
fn ComposePage() -> impl IntoView {
    let ComposeState { gate, draft, posts } = expect_context::<ComposeState>();

    let publish_gate = gate.clone();
    let on_submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        let text = draft.get().trim().to_owned();
        if text.is_empty() {
            return;
        }
        publish_gate.require_auth(move || {
            posts.update(|p| p.push(text));
            draft.set(String::new());
        });
    };

    view! {
        <section class="compose-page">
            <h1>"Compose"</h1>
            <form class="compose-page__form" on:submit=on_submit>
                <textarea
                    class="compose-page__draft"
                    placeholder="What's happening?"
                    prop:value=move || draft.get()
                    on:input=move |ev| draft.set(event_target_value(&ev))
                />
                <button type="submit" disabled=move || draft.get().trim().is_empty()>
                    "Publish"
                </button>
            </form>
            <ul class="compose-page__posts">
                <For each=move || posts.get().into_iter().enumerate() key=|(i, _)| *i let:entry>
                    <li>{entry.1}</li>
                </For>
            </ul>
            <GateModal gate/>
        </section>
    }
}
