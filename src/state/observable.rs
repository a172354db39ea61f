//! Observable state cells with synchronous change notification.
//!
//! DESIGN
//! ======
//! Stores are explicit, injectable containers instead of process-wide
//! globals. Listeners run synchronously right after a write, outside every
//! lock, so a listener may read or write any store (including the one that
//! notified it) without deadlocking. Listeners always read the latest value,
//! which keeps re-entrant writes from delivering stale snapshots.
//!
//! The UI mirrors stores into Leptos signals through [`Store`]; cross-store
//! rules (like dropping authorization on an account switch) subscribe
//! directly so they run before any render.

#[cfg(test)]
#[path = "observable_test.rs"]
mod observable_test;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Lock a mutex, recovering the data if a previous holder panicked.
///
/// Every write under these locks is a whole-value replacement, so a
/// poisoned lock still guards consistent data.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Shared<T> {
    value: Mutex<T>,
    listeners: Mutex<Vec<(u64, Listener<T>)>>,
    next_id: AtomicU64,
}

/// Shared value with subscribe/notify semantics.
pub struct Observable<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

/// Non-owning handle to an [`Observable`], used by listeners that must not
/// keep the observed store alive.
pub struct WeakObservable<T> {
    shared: Weak<Shared<T>>,
}

impl<T> Clone for WeakObservable<T> {
    fn clone(&self) -> Self {
        Self { shared: Weak::clone(&self.shared) }
    }
}

impl<T> WeakObservable<T> {
    pub fn upgrade(&self) -> Option<Observable<T>> {
        self.shared.upgrade().map(|shared| Observable { shared })
    }
}

impl<T> Observable<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    pub fn new(value: T) -> Self {
        Self {
            shared: Arc::new(Shared {
                value: Mutex::new(value),
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    pub fn get(&self) -> T {
        lock(&self.shared.value).clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&lock(&self.shared.value))
    }

    pub fn set(&self, value: T) {
        self.update(|current| *current = value);
    }

    /// Mutate the value in place. Listeners are notified only if the value
    /// actually changed, and only after the lock is released.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let (out, changed) = {
            let mut guard = lock(&self.shared.value);
            let before = guard.clone();
            let out = f(&mut guard);
            (out, *guard != before)
        };
        if changed {
            self.notify();
        }
        out
    }

    /// Register a listener. It stays registered until the returned
    /// [`Subscription`] is dropped.
    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.shared.listeners).push((id, Arc::new(listener)));

        let weak = Arc::downgrade(&self.shared);
        Subscription::new(move || {
            if let Some(shared) = weak.upgrade() {
                lock(&shared.listeners).retain(|(listener_id, _)| *listener_id != id);
            }
        })
    }

    pub fn downgrade(&self) -> WeakObservable<T> {
        WeakObservable { shared: Arc::downgrade(&self.shared) }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.shared.listeners).len()
    }

    fn notify(&self) {
        let listeners: Vec<Listener<T>> = lock(&self.shared.listeners)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            let current = self.get();
            listener(&current);
        }
    }
}

/// RAII registration handle returned by `subscribe`.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self { cancel: Some(Box::new(cancel)) }
    }

    /// Keep the listener registered for the lifetime of the observed store.
    pub fn detach(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Read/subscribe surface shared by every store, so the UI can mirror any
/// of them into a signal.
pub trait Store {
    type Snapshot: Clone + Send + Sync + 'static;

    fn snapshot(&self) -> Self::Snapshot;

    fn subscribe_snapshot(&self, listener: impl Fn(&Self::Snapshot) + Send + Sync + 'static) -> Subscription;
}

impl<T> Store for Observable<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    type Snapshot = T;

    fn snapshot(&self) -> T {
        self.get()
    }

    fn subscribe_snapshot(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        self.subscribe(listener)
    }
}
