//! Gate logic shared by components and pages.
//!
//! SYSTEM CONTEXT
//! ==============
//! `require_auth` and `guards` hold the decisions; components only render
//! what they return. `signals` bridges stores into Leptos; `expiry` pushes
//! session TTL expiry to it.

pub mod clock;
pub mod expiry;
pub mod guards;
pub mod require_auth;
pub mod signals;
