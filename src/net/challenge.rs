//! Authorization challenge and its verification backend.
//!
//! The wallet signs a one-time challenge message; the backend checks the
//! signature against the account's on-chain keys and answers accept or
//! reject. Only an accept may mark the account authorized.

#![allow(clippy::unused_async)]

#[cfg(test)]
#[path = "challenge_test.rs"]
mod challenge_test;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::wallet_provider::WalletSignature;
use crate::error::AuthError;
use crate::state::wallet::NetworkId;

const CHALLENGE_PREFIX: &str = "crosspost:authorize";

/// One-time message the connected account must sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub account_id: String,
    pub network: NetworkId,
    pub nonce: String,
    pub issued_at_ms: u64,
}

impl Challenge {
    pub fn new(account_id: &str, network: NetworkId, issued_at_ms: u64) -> Self {
        Self {
            account_id: account_id.to_owned(),
            network,
            nonce: Uuid::new_v4().simple().to_string(),
            issued_at_ms,
        }
    }

    /// Exact text handed to the wallet for signing.
    pub fn message(&self) -> String {
        format!(
            "{CHALLENGE_PREFIX}\naccount:{}\nnetwork:{}\nnonce:{}\nissued_at:{}",
            self.account_id, self.network, self.nonce, self.issued_at_ms
        )
    }
}

/// Challenge plus the wallet's signature over [`Challenge::message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedChallenge {
    pub challenge: Challenge,
    pub message: String,
    pub public_key: String,
    pub signature: String,
}

impl SignedChallenge {
    pub fn new(challenge: Challenge, signature: WalletSignature) -> Self {
        let message = challenge.message();
        Self { challenge, message, public_key: signature.public_key, signature: signature.signature }
    }
}

/// Backend answer for a signed challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(String),
}

#[async_trait(?Send)]
pub trait ChallengeVerifier: Send + Sync {
    /// Check a signed challenge.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Verification`] when the backend cannot be
    /// reached or answers with something other than a verdict.
    async fn verify(&self, signed: &SignedChallenge) -> Result<Verdict, AuthError>;
}

#[cfg(any(test, feature = "hydrate"))]
#[derive(Debug, Deserialize)]
struct VerifyResponse {
    accepted: bool,
    #[serde(default)]
    reason: Option<String>,
}

#[cfg(any(test, feature = "hydrate"))]
fn verdict_from_response(resp: VerifyResponse) -> Verdict {
    if resp.accepted {
        Verdict::Accepted
    } else {
        Verdict::Rejected(resp.reason.unwrap_or_else(|| "signature not accepted".to_owned()))
    }
}

#[cfg(any(test, feature = "hydrate"))]
fn verify_failed_message(status: u16) -> String {
    format!("verify request failed: {status}")
}

/// Verifier that posts the signed challenge as JSON to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpChallengeVerifier {
    endpoint: String,
}

impl HttpChallengeVerifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into() }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait(?Send)]
impl ChallengeVerifier for HttpChallengeVerifier {
    async fn verify(&self, signed: &SignedChallenge) -> Result<Verdict, AuthError> {
        #[cfg(feature = "hydrate")]
        {
            let resp = gloo_net::http::Request::post(&self.endpoint)
                .json(signed)
                .map_err(|e| AuthError::Verification(e.to_string()))?
                .send()
                .await
                .map_err(|e| AuthError::Verification(e.to_string()))?;
            if !resp.ok() {
                return Err(AuthError::Verification(verify_failed_message(resp.status())));
            }
            let body: VerifyResponse = resp
                .json()
                .await
                .map_err(|e| AuthError::Verification(e.to_string()))?;
            Ok(verdict_from_response(body))
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = signed;
            Err(AuthError::Verification(format!("{} is only reachable from the browser", self.endpoint)))
        }
    }
}
