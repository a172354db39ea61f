//! Error types for the wallet session gate.
//!
//! ERROR HANDLING
//! ==============
//! None of these reach a route render as a fault. Guards degrade to a
//! redirect or an in-place prompt, and `require_auth` reports `false`.
//! Variants exist so logs and the prompt can say what went wrong.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

/// Failure reported by an external wallet provider adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ProviderError(pub String);

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Authentication and authorization failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("no wallet account is connected")]
    NotConnected,
    #[error("account {account_id} has not signed the authorization challenge")]
    NotAuthorized { account_id: String },
    #[error("authorization was declined")]
    AuthorizationDeclined,
    #[error("wallet provider failed: {0}")]
    ProviderFailure(#[from] ProviderError),
    #[error("authorization for {expected} does not match connected account {actual:?}")]
    StaleAccount { expected: String, actual: Option<String> },
    #[error("challenge signature rejected: {0}")]
    SignatureRejected(String),
    #[error("challenge verification failed: {0}")]
    Verification(String),
    #[error("authorization attempt was superseded")]
    Superseded,
    #[error("authorization prompt is not open")]
    PromptClosed,
    #[error("an authorization attempt is already in flight")]
    AttemptInFlight,
}

/// Invalid gate configuration values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown network: {0}")]
    UnknownNetwork(String),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}
