//! Bookkeeping of in-flight requests keyed by URL.
//!
//! Entries live in insertion order. The same URL may be present several
//! times; URL lookups hit the first entry. Each entry also carries a private
//! id so that settling one request removes its own entry and never a sibling
//! registered under the same URL.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::transport::CancelHandle;

#[derive(Debug)]
struct TrackedRequest {
    id: u64,
    url: String,
    cancel: CancelHandle,
}

#[derive(Debug, Default)]
struct Entries {
    next_id: u64,
    tracked: Vec<TrackedRequest>,
}

#[derive(Debug, Default)]
pub struct InFlightRegistry {
    inner: Mutex<Entries>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock is only ever held for synchronous bookkeeping, so a poisoned
    /// lock still holds consistent data.
    fn entries(&self) -> MutexGuard<'_, Entries> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an entry; it is removed when the returned guard drops.
    pub fn register(&self, url: &str, cancel: CancelHandle) -> Registration<'_> {
        let mut entries = self.entries();
        let id = entries.next_id;
        entries.next_id += 1;
        entries.tracked.push(TrackedRequest {
            id,
            url: url.to_string(),
            cancel,
        });
        tracing::debug!(url, in_flight = entries.tracked.len(), "request registered");

        Registration { registry: self, id }
    }

    fn remove(&self, id: u64) {
        let mut entries = self.entries();
        if let Some(pos) = entries.tracked.iter().position(|t| t.id == id) {
            let removed = entries.tracked.remove(pos);
            tracing::debug!(
                url = %removed.url,
                in_flight = entries.tracked.len(),
                "request settled"
            );
        }
    }

    /// Cancel the first entry tracked under `url`. Returns whether one existed.
    pub fn cancel_one(&self, url: &str) -> bool {
        let handle = self
            .entries()
            .tracked
            .iter()
            .find(|t| t.url == url)
            .map(|t| t.cancel.clone());

        match handle {
            Some(handle) => {
                tracing::debug!(url, "cancelling request");
                handle.cancel();
                true
            }
            None => {
                tracing::debug!(url, "no in-flight request to cancel");
                false
            }
        }
    }

    /// Cancel every entry present right now, in registry order.
    pub fn cancel_all(&self) -> usize {
        let handles: Vec<CancelHandle> = self
            .entries()
            .tracked
            .iter()
            .map(|t| t.cancel.clone())
            .collect();

        tracing::debug!(count = handles.len(), "cancelling all in-flight requests");
        for handle in &handles {
            handle.cancel();
        }
        handles.len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.entries().tracked.iter().map(|t| t.url.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries().tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Scoped ownership of one registry entry.
#[derive(Debug)]
#[must_use = "dropping the registration removes the entry immediately"]
pub struct Registration<'a> {
    registry: &'a InFlightRegistry,
    id: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}
