//! Bridge from stores to Leptos signals.
//!
//! Stores notify synchronously; components read signals. `mirror` keeps one
//! `RwSignal` in step with a store for the lifetime of the reactive owner
//! that created it.

use leptos::prelude::*;

use crate::state::observable::Store;

/// Signal that tracks `store`, unsubscribing when the current owner is
/// cleaned up.
pub fn mirror<S: Store>(store: &S) -> RwSignal<S::Snapshot> {
    let signal = RwSignal::new(store.snapshot());
    let subscription = store.subscribe_snapshot(move |snapshot| {
        // The owner may be gone while a late provider callback still runs.
        let _ = signal.try_set(snapshot.clone());
    });
    on_cleanup(move || drop(subscription));
    signal
}
