//! Intake session: the single actor driving queue, saga and case list
//!
//! Every operation that looks at match state re-fetches the case list first.
//! A successful saga removes its email from the working set and refreshes the
//! case list exactly once; a partial failure refreshes the case list (a case
//! was created) but leaves the email in place.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::client::CaseStore;
use crate::error::{IntakeError, Result};
use crate::in_flight::InFlightRegistry;
use crate::matcher::find_duplicate_references;
use crate::models::{Case, CaseDraft, CaseGeneration, Destination, Email, MatchResult};
use crate::queue::IntakeQueue;
use crate::saga::{AssignmentSaga, SagaCompletion};

/// One email with its freshly derived match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewItem {
    pub email: Email,
    pub match_result: MatchResult,
    pub in_flight: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub emails: usize,
    pub cases: usize,
}

/// Outcome of assigning every matched email
#[derive(Debug, Default)]
pub struct AutoAssignReport {
    /// (email id, case id) pairs that were assigned
    pub assigned: Vec<(String, i64)>,
    /// Emails whose saga failed, with the error
    pub failed: Vec<(String, IntakeError)>,
    /// Matched emails skipped because a saga was already running for them
    pub skipped: Vec<String>,
    /// Emails a reload dropped while their assignment was pending and failing
    pub abandoned: Vec<String>,
    /// Emails without a matching case
    pub unmatched: usize,
}

pub struct IntakeSession {
    session_id: String,
    store: Arc<dyn CaseStore>,
    queue: Mutex<IntakeQueue>,
    saga: AssignmentSaga,
    cases: RwLock<Vec<Case>>,
    max_concurrent_assignments: usize,
}

impl IntakeSession {
    pub fn new(store: Arc<dyn CaseStore>) -> Self {
        let in_flight = InFlightRegistry::new();
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            queue: Mutex::new(IntakeQueue::new(Arc::clone(&store), Arc::clone(&in_flight))),
            saga: AssignmentSaga::new(Arc::clone(&store), in_flight),
            store,
            cases: RwLock::new(Vec::new()),
            max_concurrent_assignments: 4,
        }
    }

    pub fn with_max_concurrent_assignments(mut self, max: usize) -> Self {
        self.max_concurrent_assignments = max.max(1);
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn in_flight(&self) -> &Arc<InFlightRegistry> {
        self.saga.in_flight()
    }

    /// Manual refresh: reload unread emails and the case list
    pub async fn sync(&self) -> Result<SyncSummary> {
        let emails = self.queue.lock().await.load().await?.len();
        let cases = self.refresh_cases().await?.len();
        info!(session = %self.session_id, "Synced {} emails and {} cases", emails, cases);
        Ok(SyncSummary { emails, cases })
    }

    /// Re-fetch the case list from the store
    pub async fn refresh_cases(&self) -> Result<Vec<Case>> {
        let cases = self.store.list_cases().await?;
        for duplicate in find_duplicate_references(&cases) {
            warn!(
                session = %self.session_id,
                "Cases {:?} share reference {}; matches resolve to case {}",
                duplicate.case_ids, duplicate.reference, duplicate.case_ids[0]
            );
        }
        *self.cases.write().await = cases.clone();
        Ok(cases)
    }

    /// Case list as of the last refresh
    pub async fn cases(&self) -> Vec<Case> {
        self.cases.read().await.clone()
    }

    pub async fn emails(&self) -> Vec<Email> {
        self.queue.lock().await.emails().to_vec()
    }

    /// Emails in the working set with matches derived from a fresh case list
    pub async fn review(&self) -> Result<Vec<ReviewItem>> {
        let cases = self.refresh_cases().await?;
        let queue = self.queue.lock().await;
        let mut matches = queue.derive(&cases);

        Ok(queue
            .emails()
            .iter()
            .map(|email| ReviewItem {
                match_result: matches.remove(&email.id).unwrap_or_default(),
                in_flight: self.in_flight().is_in_flight(&email.id),
                email: email.clone(),
            })
            .collect())
    }

    /// Run the assignment saga for one email of the working set
    pub async fn assign(&self, email_id: &str, destination: Destination) -> Result<SagaCompletion> {
        let email = self
            .queue
            .lock()
            .await
            .get(email_id)
            .cloned()
            .ok_or_else(|| IntakeError::EmailNotInWorkingSet(email_id.to_string()))?;

        let result = self.saga.assign(&email, destination).await;

        match &result {
            Ok(completion) if !completion.stale => {
                self.queue.lock().await.remove(&completion.email_id);
                self.refresh_after_change().await;
            }
            Err(IntakeError::PartialSagaFailure { .. }) => {
                self.refresh_after_change().await;
            }
            _ => {}
        }

        result
    }

    /// Assign every email whose reference matches a case
    pub async fn auto_assign(&self) -> Result<AutoAssignReport> {
        let items = self.review().await?;
        let mut report = AutoAssignReport::default();
        let mut targets = Vec::new();

        for item in items {
            match item.match_result.case {
                Some(_) if item.in_flight => report.skipped.push(item.email.id),
                Some(case) => targets.push((item.email.id, case.id)),
                None => report.unmatched += 1,
            }
        }

        let results: Vec<(String, i64, Result<SagaCompletion>)> = stream::iter(targets)
            .map(|(email_id, case_id)| async move {
                let result = self
                    .assign(&email_id, Destination::AssignToExisting(case_id))
                    .await;
                (email_id, case_id, result)
            })
            .buffer_unordered(self.max_concurrent_assignments)
            .collect()
            .await;

        for (email_id, case_id, result) in results {
            match result {
                Ok(completion) if completion.assigned => report.assigned.push((email_id, case_id)),
                Ok(_) => report.abandoned.push(email_id),
                Err(IntakeError::AlreadyInFlight { .. }) => report.skipped.push(email_id),
                Err(e) => report.failed.push((email_id, e)),
            }
        }

        info!(
            session = %self.session_id,
            "Auto-assign: {} assigned, {} failed, {} skipped, {} abandoned, {} unmatched",
            report.assigned.len(),
            report.failed.len(),
            report.skipped.len(),
            report.abandoned.len(),
            report.unmatched
        );
        Ok(report)
    }

    /// Create a case outside any saga, then refresh the case list
    pub async fn create_case(&self, draft: &CaseDraft) -> Result<Case> {
        let case = self.store.create_case(draft).await?;
        info!(session = %self.session_id, "Created case {} ({})", case.id, case.reference_label());
        self.refresh_after_change().await;
        Ok(case)
    }

    /// Have the store generate a case, then refresh the case list
    pub async fn generate_case(&self, generation: &CaseGeneration) -> Result<Case> {
        let case = self.store.generate_case(generation).await?;
        info!(
            session = %self.session_id,
            "Generated case {} with {} emails",
            case.id, case.email_count
        );
        self.refresh_after_change().await;
        Ok(case)
    }

    async fn refresh_after_change(&self) {
        if let Err(e) = self.refresh_cases().await {
            warn!(session = %self.session_id, "Case list refresh failed: {}", e);
        }
    }
}
