//! Scripted wallet provider and verifier for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::FutureExt;
use futures::channel::oneshot;

use crate::config::GateConfig;
use crate::error::{AuthError, ProviderError};
use crate::net::challenge::{ChallengeVerifier, SignedChallenge, Verdict};
use crate::net::wallet_provider::{AccountListener, SignFuture, WalletHandle, WalletProvider, WalletSignature};
use crate::state::session::AuthSession;
use crate::state::wallet::NetworkId;
use crate::util::clock::ManualClock;

pub const START_MS: u64 = 1_700_000_000_000;

type SignResult = Result<WalletSignature, ProviderError>;

enum SignReply {
    Now(SignResult),
    Later(oneshot::Receiver<SignResult>),
}

#[derive(Default)]
struct ProviderLog {
    starts: Vec<NetworkId>,
    listeners: Vec<AccountListener>,
    fail_next_start: Option<String>,
    account_on_start: Option<String>,
    released: usize,
    sign_outs: usize,
    sign_in_requests: usize,
    signed_messages: Vec<String>,
    sign_replies: VecDeque<SignReply>,
}

/// Provider whose account changes are driven by the test.
#[derive(Clone, Default)]
pub struct FakeProvider {
    log: Arc<Mutex<ProviderLog>>,
}

impl FakeProvider {
    pub fn fail_next_start(&self, message: &str) {
        self.log.lock().unwrap().fail_next_start = Some(message.to_owned());
    }

    /// Report `account` synchronously from inside `start_up`.
    pub fn account_on_start(&self, account: &str) {
        self.log.lock().unwrap().account_on_start = Some(account.to_owned());
    }

    /// Report an account change from the most recent handle.
    pub fn emit(&self, account: Option<&str>) {
        let listener = self.log.lock().unwrap().listeners.last().cloned();
        if let Some(listener) = listener {
            listener(account.map(str::to_owned));
        }
    }

    /// Report an account change from the handle started `index`-th.
    pub fn emit_from(&self, index: usize, account: Option<&str>) {
        let listener = self.log.lock().unwrap().listeners.get(index).cloned();
        if let Some(listener) = listener {
            listener(account.map(str::to_owned));
        }
    }

    pub fn fail_next_signature(&self, message: &str) {
        self.log
            .lock()
            .unwrap()
            .sign_replies
            .push_back(SignReply::Now(Err(ProviderError::new(message))));
    }

    /// Hold the next signature until the returned sender fires.
    pub fn defer_next_signature(&self) -> oneshot::Sender<SignResult> {
        let (tx, rx) = oneshot::channel();
        self.log.lock().unwrap().sign_replies.push_back(SignReply::Later(rx));
        tx
    }

    pub fn starts(&self) -> Vec<NetworkId> {
        self.log.lock().unwrap().starts.clone()
    }

    pub fn released(&self) -> usize {
        self.log.lock().unwrap().released
    }

    pub fn sign_outs(&self) -> usize {
        self.log.lock().unwrap().sign_outs
    }

    pub fn sign_in_requests(&self) -> usize {
        self.log.lock().unwrap().sign_in_requests
    }

    pub fn signed_messages(&self) -> Vec<String> {
        self.log.lock().unwrap().signed_messages.clone()
    }
}

pub fn signature() -> WalletSignature {
    WalletSignature { public_key: "ed25519:test".into(), signature: "c2lnbmVk".into() }
}

impl WalletProvider for FakeProvider {
    fn start_up(
        &self,
        network: NetworkId,
        on_account_change: AccountListener,
    ) -> Result<Box<dyn WalletHandle>, ProviderError> {
        let account = {
            let mut log = self.log.lock().unwrap();
            log.starts.push(network);
            if let Some(message) = log.fail_next_start.take() {
                return Err(ProviderError::new(message));
            }
            log.listeners.push(Arc::clone(&on_account_change));
            log.account_on_start.take()
        };
        if let Some(account) = account {
            on_account_change(Some(account));
        }
        Ok(Box::new(FakeHandle { log: Arc::clone(&self.log) }))
    }
}

struct FakeHandle {
    log: Arc<Mutex<ProviderLog>>,
}

impl WalletHandle for FakeHandle {
    fn request_sign_in(&self) {
        self.log.lock().unwrap().sign_in_requests += 1;
    }

    fn sign_out(&mut self) {
        self.log.lock().unwrap().sign_outs += 1;
    }

    fn sign_message(&self, message: &str) -> SignFuture {
        let reply = {
            let mut log = self.log.lock().unwrap();
            log.signed_messages.push(message.to_owned());
            log.sign_replies.pop_front()
        };
        match reply {
            None => futures::future::ready(Ok(signature())).boxed_local(),
            Some(SignReply::Now(result)) => futures::future::ready(result).boxed_local(),
            Some(SignReply::Later(rx)) => async move {
                rx.await
                    .unwrap_or_else(|_| Err(ProviderError::new("signature request dropped")))
            }
            .boxed_local(),
        }
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.log.lock().unwrap().released += 1;
    }
}

enum VerifyReply {
    Now(Result<Verdict, AuthError>),
    Later(oneshot::Receiver<Result<Verdict, AuthError>>),
}

/// Verifier that accepts unless told otherwise.
#[derive(Clone, Default)]
pub struct FakeVerifier {
    replies: Arc<Mutex<VecDeque<VerifyReply>>>,
    seen: Arc<Mutex<Vec<SignedChallenge>>>,
}

impl FakeVerifier {
    pub fn reply_next(&self, reply: Result<Verdict, AuthError>) {
        self.replies.lock().unwrap().push_back(VerifyReply::Now(reply));
    }

    pub fn defer_next(&self) -> oneshot::Sender<Result<Verdict, AuthError>> {
        let (tx, rx) = oneshot::channel();
        self.replies.lock().unwrap().push_back(VerifyReply::Later(rx));
        tx
    }

    pub fn seen(&self) -> Vec<SignedChallenge> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait(?Send)]
impl ChallengeVerifier for FakeVerifier {
    async fn verify(&self, signed: &SignedChallenge) -> Result<Verdict, AuthError> {
        self.seen.lock().unwrap().push(signed.clone());
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            None => Ok(Verdict::Accepted),
            Some(VerifyReply::Now(result)) => result,
            Some(VerifyReply::Later(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(AuthError::Verification("verifier dropped".into()))),
        }
    }
}

/// Isolated session plus handles to its fakes.
pub struct Harness {
    pub session: AuthSession,
    pub provider: FakeProvider,
    pub verifier: FakeVerifier,
    pub clock: ManualClock,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(GateConfig::default())
    }

    pub fn with_config(config: GateConfig) -> Self {
        let provider = FakeProvider::default();
        let verifier = FakeVerifier::default();
        let clock = ManualClock::at(START_MS);
        let session = AuthSession::new(
            config,
            Arc::new(provider.clone()),
            Arc::new(verifier.clone()),
            Arc::new(clock.clone()),
        );
        Self { session, provider, verifier, clock }
    }

    /// Start the wallet and have the provider report `account`.
    pub fn connect_as(&self, account: &str) {
        self.session.start();
        self.provider.emit(Some(account));
    }

    /// Connect and record a grant without going through the prompt.
    pub fn authorize_as(&self, account: &str) {
        self.connect_as(account);
        self.session.authorization.set_authorized(account).unwrap();
    }
}
