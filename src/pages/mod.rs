//! Route-level page components.

pub mod compose;
pub mod home;
pub mod profile;
