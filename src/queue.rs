//! Working set of unread emails awaiting assignment

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::info;

use crate::client::CaseStore;
use crate::error::Result;
use crate::extractor::extract_from_email;
use crate::in_flight::InFlightRegistry;
use crate::matcher::match_case;
use crate::models::{Case, Email, MatchResult};

/// Holds the unread emails of one sync session
///
/// Match state is never stored here: [`IntakeQueue::derive`] recomputes it from
/// whatever case set it is given.
pub struct IntakeQueue {
    store: Arc<dyn CaseStore>,
    in_flight: Arc<InFlightRegistry>,
    emails: Vec<Email>,
}

impl IntakeQueue {
    pub fn new(store: Arc<dyn CaseStore>, in_flight: Arc<InFlightRegistry>) -> Self {
        Self {
            store,
            in_flight,
            emails: Vec::new(),
        }
    }

    /// Replace the working set with the store's current unread emails
    ///
    /// In-flight entries for emails that are gone are discarded. On error the
    /// previous working set is kept.
    pub async fn load(&mut self) -> Result<&[Email]> {
        let emails = self.store.list_unread_emails().await?;

        let stale = {
            let present: HashSet<&str> = emails.iter().map(|e| e.id.as_str()).collect();
            self.in_flight.discard_missing(&present)
        };
        if !stale.is_empty() {
            info!(
                "{} in-flight email(s) no longer unread after reload",
                stale.len()
            );
        }

        self.emails = emails;
        info!("Loaded {} unread emails", self.emails.len());
        Ok(&self.emails)
    }

    /// Match every email in the working set against `cases`
    pub fn derive(&self, cases: &[Case]) -> HashMap<String, MatchResult> {
        self.emails
            .iter()
            .map(|email| {
                let token = extract_from_email(email);
                let case = match_case(token.as_ref(), cases).cloned();
                (email.id.clone(), MatchResult { token, case })
            })
            .collect()
    }

    /// Remove one email after it was assigned
    pub fn remove(&mut self, email_id: &str) -> Option<Email> {
        let index = self.emails.iter().position(|e| e.id == email_id)?;
        Some(self.emails.remove(index))
    }

    pub fn get(&self, email_id: &str) -> Option<&Email> {
        self.emails.iter().find(|e| e.id == email_id)
    }

    pub fn emails(&self) -> &[Email] {
        &self.emails
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}
