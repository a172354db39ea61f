//! # crosspost
//!
//! Leptos + WASM front end that gates protected actions and routes behind a
//! connected wallet and a signed authorization challenge.
//!
//! This crate contains the wallet and authorization stores, the deferred
//! action gate, route guards, and the pages and components that render them.
//! Everything outside `components`, `pages`, and `app` is plain Rust and
//! runs natively under `cargo test`.

pub mod app;
pub mod components;
pub mod config;
pub mod error;
pub mod net;
pub mod pages;
pub mod state;
pub mod util;

#[cfg(test)]
mod test_support;

/// Browser entry point: install logging and hydrate the server-rendered shell.
#[cfg(feature = "hydrate")]
#[wasm_bindgen::prelude::wasm_bindgen]
pub fn hydrate() {
    console_error_panic_hook::set_once();
    // A second init (hot reload) fails harmlessly; keep the first logger.
    let _ = console_log::init_with_level(log::Level::Debug);
    leptos::mount::hydrate_body(app::App);
}
