//! Strip of dismissible notices at the top of every page.

use leptos::prelude::*;

use crate::state::notices::{Notice, NoticeKind};
use crate::state::session::AuthSession;

fn notice_class(kind: NoticeKind) -> &'static str {
    match kind {
        NoticeKind::Info => "notice notice--info",
        NoticeKind::Warning => "notice notice--warning",
        NoticeKind::Error => "notice notice--error",
    }
}

#[component]
pub fn NoticeBar() -> impl IntoView {
    let session = expect_context::<AuthSession>();
    let notices = expect_context::<RwSignal<Vec<Notice>>>();

    view! {
        <div class="notice-bar" role="status">
            <For each=move || notices.get() key=|notice| notice.id let:notice>
                {
                    let session = session.clone();
                    let id = notice.id;
                    view! {
                        <div class=notice_class(notice.kind)>
                            <span class="notice__message">{notice.message}</span>
                            <button
                                class="notice__dismiss"
                                title="Dismiss"
                                on:click=move |_| session.notices.dismiss(id)
                            >
                                "✕"
                            </button>
                        </div>
                    }
                }
            </For>
        </div>
    }
}
