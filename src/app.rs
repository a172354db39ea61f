//! Root application component with routing and context providers.

use leptos::logging::warn;
use leptos::prelude::*;
use leptos_meta::{MetaTags, Stylesheet, Title, provide_meta_context};
use leptos_router::{
    StaticSegment,
    components::{Route, Router, Routes},
};

use crate::components::notice_bar::NoticeBar;
use crate::components::route_guard::RequireWalletConnection;
use crate::config::GateConfig;
use crate::pages::{compose::ComposeRoute, home::HomePage, profile::ProfilePage};
use crate::state::session::AuthSession;
use crate::util::expiry::watch_expiry;
use crate::util::signals::mirror;

/// HTML shell rendered on the server for SSR + hydration.
pub fn shell(options: LeptosOptions) -> impl IntoView {
    view! {
        <!DOCTYPE html>
        <html lang="en">
            <head>
                <meta charset="utf-8"/>
                <meta name="viewport" content="width=device-width, initial-scale=1"/>
                <AutoReload options=options.clone()/>
                <HydrationScripts options/>
                <MetaTags/>
            </head>
            <body>
                <App/>
            </body>
        </html>
    }
}

/// Root application component.
///
/// Builds the session, mirrors its stores into signals for child
/// components, and starts the wallet once the page is live.
#[component]
pub fn App() -> impl IntoView {
    provide_meta_context();

    let config = GateConfig::from_build_env().unwrap_or_else(|err| {
        warn!("config: {err}; falling back to defaults");
        GateConfig::default()
    });
    let session = AuthSession::for_browser(config);

    let authorization = mirror(&session.authorization);
    watch_expiry(session.authorization.clone(), authorization);
    provide_context(mirror(&session.wallet));
    provide_context(authorization);
    provide_context(mirror(&session.notices));
    provide_context(session.clone());

    // Effects only run in the browser, after hydration, so the server never
    // touches the wallet provider and the first client render matches it.
    let starter = session.clone();
    Effect::new(move || starter.start());

    on_cleanup(move || session.wallet.release());

    view! {
        <Stylesheet id="leptos" href="/pkg/crosspost.css"/>
        <Title text="Crosspost"/>

        <Router>
            <NoticeBar/>
            <main class="app-main">
                <Routes fallback=|| "Page not found.".into_view()>
                    <Route path=StaticSegment("") view=HomePage/>
                    <Route
                        path=StaticSegment("profile")
                        view=|| view! { <RequireWalletConnection><ProfilePage/></RequireWalletConnection> }
                    />
                    <Route path=StaticSegment("compose") view=ComposeRoute/>
                </Routes>
            </main>
        </Router>
    }
}
