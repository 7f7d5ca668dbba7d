//! Append-only, observable conversation log.

use crate::observers::{Observers, SubscriptionId};

use models::ChatEntry;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Ordered sequence of conversation entries.
///
/// Cloning yields another handle to the same log. Only the dispatcher can
/// append; everyone else reads through [`MessageLog::snapshot`] or a
/// subscription. Entries are never mutated or removed.
///
/// Observers may append from inside their callback. The nested entry is
/// stored immediately and delivered after the current notification returns,
/// so every observer still sees entries in append order.
#[derive(Clone, Default)]
pub struct MessageLog {
    inner: Arc<LogInner>,
}

#[derive(Default)]
struct LogInner {
    entries: RwLock<Vec<ChatEntry>>,
    observers: Observers<ChatEntry>,
    delivery: Mutex<Delivery>,
}

/// Entries stored but not yet handed to observers.
///
/// Exactly one thread drains the queue at a time; the others only enqueue.
#[derive(Default)]
struct Delivery {
    pending: VecDeque<ChatEntry>,
    draining: bool,
}

/// Clears `draining` if an observer panics mid-delivery.
struct DrainGuard<'a> {
    delivery: &'a Mutex<Delivery>,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut delivery = self
                .delivery
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            delivery.pending.clear();
            delivery.draining = false;
        }
    }
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&self, entry: ChatEntry) {
        {
            let mut delivery = self.lock_delivery();

            // Store and enqueue under one lock so delivery order matches log order.
            self.inner
                .entries
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .push(entry.clone());
            delivery.pending.push_back(entry);

            if delivery.draining {
                return;
            }
            delivery.draining = true;
        }

        let _guard = DrainGuard {
            delivery: &self.inner.delivery,
        };
        loop {
            let next = {
                let mut delivery = self.lock_delivery();
                match delivery.pending.pop_front() {
                    Some(next) => next,
                    None => {
                        delivery.draining = false;
                        return;
                    }
                }
            };
            self.inner.observers.notify(&next);
        }
    }

    fn lock_delivery(&self) -> std::sync::MutexGuard<'_, Delivery> {
        self.inner
            .delivery
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// The full ordered sequence at the time of the call.
    pub fn snapshot(&self) -> Vec<ChatEntry> {
        self.inner
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Receive every entry appended after this call, in append order.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&ChatEntry) + Send + Sync + 'static,
    {
        self.inner.observers.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.observers.unsubscribe(id)
    }

    pub fn len(&self) -> usize {
        self.inner
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for MessageLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageLog")
            .field("len", &self.len())
            .field("observers", &self.inner.observers.len())
            .finish()
    }
}
