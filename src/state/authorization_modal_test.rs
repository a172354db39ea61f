use std::sync::Mutex;

use futures::FutureExt;
use futures::executor::block_on;

use super::*;
use crate::error::ProviderError;
use crate::test_support::{Harness, signature};

fn modal(h: &Harness) -> (AuthorizationModal, Arc<Mutex<Vec<ModalOutcome>>>) {
    let outcomes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&outcomes);
    let modal = AuthorizationModal::new(&h.session, move |outcome| sink.lock().unwrap().push(outcome));
    (modal, outcomes)
}

// =============================================================
// open / cancel
// =============================================================

#[test]
fn starts_closed() {
    let h = Harness::new();
    let (modal, _) = modal(&h);
    assert_eq!(modal.snapshot(), ModalState::default());
    assert!(!modal.is_open());
}

#[test]
fn open_is_idempotent() {
    let h = Harness::new();
    h.connect_as("alice.near");
    let (modal, _) = modal(&h);

    assert!(modal.open("alice.near"));
    let attempt = modal.snapshot().attempt;
    assert!(!modal.open("alice.near"));

    let state = modal.snapshot();
    assert_eq!(state.phase, ModalPhase::Prompt);
    assert_eq!(state.account_id.as_deref(), Some("alice.near"));
    assert_eq!(state.attempt, attempt);
}

#[test]
fn cancel_closes_and_reports_dismissed() {
    let h = Harness::new();
    h.connect_as("alice.near");
    let (modal, outcomes) = modal(&h);
    modal.open("alice.near");

    assert!(modal.cancel(CancelReason::Dismissed));

    assert!(!modal.is_open());
    assert_eq!(
        *outcomes.lock().unwrap(),
        vec![ModalOutcome::Cancelled { reason: CancelReason::Dismissed }]
    );
    assert!(!h.session.authorization.snapshot().is_authorized);
}

#[test]
fn cancel_when_closed_reports_nothing() {
    let h = Harness::new();
    let (modal, outcomes) = modal(&h);
    assert!(!modal.cancel(CancelReason::Dismissed));
    assert!(outcomes.lock().unwrap().is_empty());
}

// =============================================================
// authorize
// =============================================================

#[test]
fn authorize_grants_then_closes_then_reports() {
    let h = Harness::new();
    h.connect_as("alice.near");
    let outcomes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&outcomes);
    let auth = h.session.authorization.clone();
    let modal_slot: Arc<Mutex<Option<AuthorizationModal>>> = Arc::new(Mutex::new(None));
    let reader = Arc::clone(&modal_slot);
    let modal = AuthorizationModal::new(&h.session, move |outcome| {
        // The grant is visible and the prompt closed before the owner hears about it.
        let closed = reader.lock().unwrap().as_ref().is_some_and(|m| !m.is_open());
        sink.lock().unwrap().push((outcome, auth.snapshot().is_authorized, closed));
    });
    *modal_slot.lock().unwrap() = Some(modal.clone());
    modal.open("alice.near");

    block_on(modal.authorize()).unwrap();

    assert_eq!(
        *outcomes.lock().unwrap(),
        vec![(ModalOutcome::Authorized { account_id: "alice.near".into() }, true, true)]
    );
    assert!(h.session.authorization.is_authorized_for("alice.near"));
}

#[test]
fn authorize_signs_challenge_for_prompt_account() {
    let h = Harness::new();
    h.connect_as("alice.near");
    let (modal, _) = modal(&h);
    modal.open("alice.near");

    block_on(modal.authorize()).unwrap();

    let seen = h.verifier.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].challenge.account_id, "alice.near");
    assert_eq!(seen[0].signature, signature().signature);
    assert_eq!(h.provider.signed_messages(), vec![seen[0].message.clone()]);
}

#[test]
fn authorize_when_closed_errors() {
    let h = Harness::new();
    let (modal, _) = modal(&h);
    assert_eq!(block_on(modal.authorize()), Err(AuthError::PromptClosed));
}

#[test]
fn rejected_signature_moves_to_failed_and_allows_retry() {
    let h = Harness::new();
    h.connect_as("alice.near");
    let (modal, outcomes) = modal(&h);
    modal.open("alice.near");
    h.verifier.reply_next(Ok(Verdict::Rejected("bad key".into())));

    let err = block_on(modal.authorize()).unwrap_err();

    assert_eq!(err, AuthError::SignatureRejected("bad key".into()));
    let state = modal.snapshot();
    assert_eq!(state.phase, ModalPhase::Failed);
    assert!(state.error.unwrap().contains("bad key"));
    assert!(outcomes.lock().unwrap().is_empty());
    assert!(!h.session.authorization.snapshot().is_authorized);

    block_on(modal.authorize()).unwrap();
    assert!(h.session.authorization.is_authorized_for("alice.near"));
}

#[test]
fn provider_signing_failure_moves_to_failed() {
    let h = Harness::new();
    h.connect_as("alice.near");
    let (modal, _) = modal(&h);
    modal.open("alice.near");
    h.provider.fail_next_signature("user rejected");

    let err = block_on(modal.authorize()).unwrap_err();

    assert_eq!(err, AuthError::ProviderFailure(ProviderError::new("user rejected")));
    assert_eq!(modal.snapshot().phase, ModalPhase::Failed);
}

#[test]
fn verifier_error_moves_to_failed() {
    let h = Harness::new();
    h.connect_as("alice.near");
    let (modal, _) = modal(&h);
    modal.open("alice.near");
    h.verifier.reply_next(Err(AuthError::Verification("503".into())));

    assert!(block_on(modal.authorize()).is_err());
    assert_eq!(modal.snapshot().phase, ModalPhase::Failed);
}

#[test]
fn second_authorize_while_in_flight_is_refused() {
    let h = Harness::new();
    h.connect_as("alice.near");
    let (modal, _) = modal(&h);
    modal.open("alice.near");
    let _hold = h.provider.defer_next_signature();

    let mut first = Box::pin(modal.authorize());
    assert!(first.as_mut().now_or_never().is_none());
    assert_eq!(modal.snapshot().phase, ModalPhase::Signing);

    assert_eq!(block_on(modal.authorize()), Err(AuthError::AttemptInFlight));
}

// =============================================================
// Cancellation races
// =============================================================

#[test]
fn signature_arriving_after_cancel_is_discarded() {
    let h = Harness::new();
    h.connect_as("alice.near");
    let (modal, outcomes) = modal(&h);
    modal.open("alice.near");
    let release = h.provider.defer_next_signature();

    let mut attempt = Box::pin(modal.authorize());
    assert!(attempt.as_mut().now_or_never().is_none());
    modal.cancel(CancelReason::Dismissed);
    release.send(Ok(signature())).unwrap();

    assert_eq!(block_on(attempt), Err(AuthError::Superseded));
    assert!(!h.session.authorization.snapshot().is_authorized);
    assert!(h.verifier.seen().is_empty());
    assert_eq!(
        *outcomes.lock().unwrap(),
        vec![ModalOutcome::Cancelled { reason: CancelReason::Dismissed }]
    );
}

#[test]
fn verdict_arriving_after_cancel_is_discarded() {
    let h = Harness::new();
    h.connect_as("alice.near");
    let (modal, _) = modal(&h);
    modal.open("alice.near");
    let release = h.verifier.defer_next();

    let mut attempt = Box::pin(modal.authorize());
    assert!(attempt.as_mut().now_or_never().is_none());
    assert_eq!(modal.snapshot().phase, ModalPhase::Verifying);
    modal.cancel(CancelReason::Dismissed);
    release.send(Ok(Verdict::Accepted)).unwrap();

    assert_eq!(block_on(attempt), Err(AuthError::Superseded));
    assert!(!h.session.authorization.snapshot().is_authorized);
}

#[test]
fn reopened_prompt_ignores_previous_attempt() {
    let h = Harness::new();
    h.connect_as("alice.near");
    let (modal, _) = modal(&h);
    modal.open("alice.near");
    let release = h.verifier.defer_next();

    let mut stale = Box::pin(modal.authorize());
    assert!(stale.as_mut().now_or_never().is_none());
    modal.cancel(CancelReason::Dismissed);
    modal.open("alice.near");
    release.send(Ok(Verdict::Accepted)).unwrap();

    assert_eq!(block_on(stale), Err(AuthError::Superseded));
    assert_eq!(modal.snapshot().phase, ModalPhase::Prompt);
    assert!(!h.session.authorization.snapshot().is_authorized);
}

#[test]
fn account_switch_closes_prompt_and_discards_attempt() {
    let h = Harness::new();
    h.connect_as("alice.near");
    let (modal, outcomes) = modal(&h);
    modal.open("alice.near");
    let release = h.verifier.defer_next();

    let mut attempt = Box::pin(modal.authorize());
    assert!(attempt.as_mut().now_or_never().is_none());
    h.provider.emit(Some("bob.near"));
    release.send(Ok(Verdict::Accepted)).unwrap();

    assert_eq!(block_on(attempt), Err(AuthError::Superseded));
    assert!(!modal.is_open());
    assert!(!h.session.authorization.snapshot().is_authorized);
    assert_eq!(
        *outcomes.lock().unwrap(),
        vec![ModalOutcome::Cancelled { reason: CancelReason::AccountChanged }]
    );
}

#[test]
fn disconnect_closes_open_prompt() {
    let h = Harness::new();
    h.connect_as("alice.near");
    let (modal, outcomes) = modal(&h);
    modal.open("alice.near");

    h.session.wallet.disconnect();

    assert!(!modal.is_open());
    assert_eq!(outcomes.lock().unwrap().len(), 1);
}

// =============================================================
// Grants recorded elsewhere
// =============================================================

#[test]
fn grant_from_another_prompt_closes_as_authorized() {
    let h = Harness::new();
    h.connect_as("alice.near");
    let (first, _) = modal(&h);
    let (second, outcomes) = modal(&h);
    first.open("alice.near");
    second.open("alice.near");

    block_on(first.authorize()).unwrap();

    assert!(!second.is_open());
    assert_eq!(
        *outcomes.lock().unwrap(),
        vec![ModalOutcome::Authorized { account_id: "alice.near".into() }]
    );
    assert_eq!(h.verifier.seen().len(), 1);
}

#[test]
fn own_grant_is_reported_once() {
    let h = Harness::new();
    h.connect_as("alice.near");
    let (modal, outcomes) = modal(&h);
    modal.open("alice.near");

    block_on(modal.authorize()).unwrap();

    assert_eq!(outcomes.lock().unwrap().len(), 1);
}

#[test]
fn grant_elsewhere_supersedes_attempt_in_flight() {
    let h = Harness::new();
    h.connect_as("alice.near");
    let (modal, outcomes) = modal(&h);
    modal.open("alice.near");
    let release = h.provider.defer_next_signature();

    let mut attempt = Box::pin(modal.authorize());
    assert!(attempt.as_mut().now_or_never().is_none());
    h.session.authorization.set_authorized("alice.near").unwrap();
    release.send(Ok(signature())).unwrap();

    assert_eq!(block_on(attempt), Err(AuthError::Superseded));
    assert!(h.verifier.seen().is_empty());
    assert_eq!(
        *outcomes.lock().unwrap(),
        vec![ModalOutcome::Authorized { account_id: "alice.near".into() }]
    );
}

#[test]
fn closed_prompt_ignores_grants() {
    let h = Harness::new();
    h.connect_as("alice.near");
    let (_modal, outcomes) = modal(&h);

    h.session.authorization.set_authorized("alice.near").unwrap();

    assert!(outcomes.lock().unwrap().is_empty());
}

#[test]
fn cancel_reasons_map_to_errors() {
    assert_eq!(AuthError::from(CancelReason::Dismissed), AuthError::AuthorizationDeclined);
    assert_eq!(AuthError::from(CancelReason::AccountChanged), AuthError::Superseded);
}
