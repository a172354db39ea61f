//! Session state for the wallet gate.
//!
//! DESIGN
//! ======
//! Each store is an explicitly constructed, clonable handle over shared
//! state with synchronous subscriptions (`observable`). `session` builds one
//! set per app instance; the UI mirrors them into signals.

pub mod authorization;
pub mod authorization_modal;
pub mod notices;
pub mod observable;
pub mod session;
pub mod wallet;
