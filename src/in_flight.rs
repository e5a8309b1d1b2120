//! Per-email in-flight tracking for assignment sagas
//!
//! Holds the set of email ids with a saga running. Each entry carries a ticket
//! number so a saga can tell, when it finishes, whether its entry was discarded
//! by a working-set reload in the meantime.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Debug, Default)]
pub struct InFlightRegistry {
    entries: Mutex<HashMap<String, u64>>,
    next_ticket: AtomicU64,
}

/// Proof that a saga holds the in-flight slot for one email
///
/// Dropping the ticket clears the slot, unless a reload already discarded it
/// (or a newer ticket took its place).
#[derive(Debug)]
pub struct InFlightTicket {
    registry: Arc<InFlightRegistry>,
    email_id: String,
    number: u64,
}

impl InFlightRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, u64>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the slot for `email_id`; `None` if a saga already holds it
    pub fn try_begin(self: &Arc<Self>, email_id: &str) -> Option<InFlightTicket> {
        let mut entries = self.entries();
        if entries.contains_key(email_id) {
            return None;
        }
        let number = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        entries.insert(email_id.to_string(), number);

        Some(InFlightTicket {
            registry: Arc::clone(self),
            email_id: email_id.to_string(),
            number,
        })
    }

    pub fn is_in_flight(&self, email_id: &str) -> bool {
        self.entries().contains_key(email_id)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Drop every entry whose email is not in `present`; returns the dropped ids
    pub fn discard_missing(&self, present: &HashSet<&str>) -> Vec<String> {
        let mut entries = self.entries();
        let stale: Vec<String> = entries
            .keys()
            .filter(|id| !present.contains(id.as_str()))
            .cloned()
            .collect();
        for id in &stale {
            entries.remove(id);
            debug!("Discarded stale in-flight entry for email {}", id);
        }
        stale
    }

    fn holds(&self, email_id: &str, number: u64) -> bool {
        self.entries().get(email_id) == Some(&number)
    }

    fn release(&self, email_id: &str, number: u64) {
        let mut entries = self.entries();
        if entries.get(email_id) == Some(&number) {
            entries.remove(email_id);
        }
    }
}

impl InFlightTicket {
    pub fn email_id(&self) -> &str {
        &self.email_id
    }

    /// False once a reload has discarded this ticket's entry
    pub fn is_current(&self) -> bool {
        self.registry.holds(&self.email_id, self.number)
    }
}

impl Drop for InFlightTicket {
    fn drop(&mut self) {
        self.registry.release(&self.email_id, self.number);
    }
}
