//! Reusable UI component modules.
//!
//! SYSTEM CONTEXT
//! ==============
//! Components render gate state read from Leptos context and forward user
//! intent to the session stores; none of them decide access on their own.

pub mod authorization_modal;
pub mod notice_bar;
pub mod route_guard;
