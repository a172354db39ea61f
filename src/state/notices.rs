//! Transient user notices ("connect a wallet first", provider failures).

#[cfg(test)]
#[path = "notices_test.rs"]
mod notices_test;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::observable::{Observable, Store, Subscription};

/// Oldest notices are dropped beyond this many.
pub const MAX_NOTICES: usize = 5;

pub const CONNECT_WALLET_NOTICE: &str = "Connect a wallet first.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub kind: NoticeKind,
    pub message: String,
}

/// Bounded, observable list of notices.
#[derive(Clone)]
pub struct Notices {
    list: Observable<Vec<Notice>>,
    next_id: Arc<AtomicU64>,
}

impl Default for Notices {
    fn default() -> Self {
        Self { list: Observable::new(Vec::new()), next_id: Arc::new(AtomicU64::new(1)) }
    }
}

impl Notices {
    pub fn push(&self, kind: NoticeKind, message: impl Into<String>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let notice = Notice { id, kind, message: message.into() };
        self.list.update(|list| {
            list.push(notice);
            if list.len() > MAX_NOTICES {
                let excess = list.len() - MAX_NOTICES;
                list.drain(..excess);
            }
        });
        id
    }

    pub fn dismiss(&self, id: u64) {
        self.list.update(|list| list.retain(|n| n.id != id));
    }

    pub fn snapshot(&self) -> Vec<Notice> {
        self.list.get()
    }

    pub fn latest(&self) -> Option<Notice> {
        self.list.with(|list| list.last().cloned())
    }

    pub fn subscribe(&self, listener: impl Fn(&Vec<Notice>) + Send + Sync + 'static) -> Subscription {
        self.list.subscribe(listener)
    }
}

impl Store for Notices {
    type Snapshot = Vec<Notice>;

    fn snapshot(&self) -> Vec<Notice> {
        Notices::snapshot(self)
    }

    fn subscribe_snapshot(&self, listener: impl Fn(&Vec<Notice>) + Send + Sync + 'static) -> Subscription {
        self.subscribe(listener)
    }
}
