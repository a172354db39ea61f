//! External collaborators: the wallet provider and the challenge verifier.
//!
//! SYSTEM CONTEXT
//! ==============
//! Both sit behind traits so the state machine never talks to the browser
//! directly. Browser implementations compile only with `hydrate`.

pub mod challenge;
pub mod wallet_provider;
