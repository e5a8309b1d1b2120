//! Assignment saga: create-if-needed, then assign, against the case store
//!
//! There is no cross-step rollback. A case created in step one stays created
//! even when step two fails; that outcome is reported as a
//! [`IntakeError::PartialSagaFailure`] and never retried here, because
//! repeating the creation would duplicate the case.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::CaseStore;
use crate::error::{IntakeError, Result};
use crate::in_flight::{InFlightRegistry, InFlightTicket};
use crate::models::{Case, Destination, Email};

/// End of a saga that did not fail, or whose failure no longer matters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SagaCompletion {
    pub email_id: String,
    /// Case the email was meant for; `None` when case creation failed
    pub case_id: Option<i64>,
    /// The case created by a create-then-assign saga
    pub created_case: Option<Case>,
    /// Whether the store accepted the assignment
    pub assigned: bool,
    /// The email left the working set while the saga ran; completion side
    /// effects must be skipped
    pub stale: bool,
}

pub struct AssignmentSaga {
    store: Arc<dyn CaseStore>,
    in_flight: Arc<InFlightRegistry>,
}

impl AssignmentSaga {
    pub fn new(store: Arc<dyn CaseStore>, in_flight: Arc<InFlightRegistry>) -> Self {
        Self { store, in_flight }
    }

    pub fn in_flight(&self) -> &Arc<InFlightRegistry> {
        &self.in_flight
    }

    /// Run the saga for `email`
    ///
    /// A second call for the same email while one is running fails with
    /// [`IntakeError::AlreadyInFlight`] before any store call is made. When a
    /// reload drops the email while a store call is pending, a failure of that
    /// call is not reported: the saga completes as stale and unassigned.
    pub async fn assign(&self, email: &Email, destination: Destination) -> Result<SagaCompletion> {
        let ticket = self.in_flight.try_begin(&email.id).ok_or_else(|| {
            debug!("Rejected duplicate assignment of email {}", email.id);
            IntakeError::AlreadyInFlight {
                email_id: email.id.clone(),
            }
        })?;

        let mut created_case = None;
        let result = match destination {
            Destination::AssignToExisting(case_id) => {
                self.assign_direct(&email.id, case_id).await.map(|()| case_id)
            }
            Destination::CreateThenAssign(draft) => {
                let created = self.store.create_case(&draft).await;
                self.assign_new_case(&email.id, &draft.name, created, &mut created_case)
                    .await
            }
            Destination::GenerateThenAssign(generation) => {
                let created = self.store.generate_case(&generation).await;
                self.assign_new_case(&email.id, &generation.description, created, &mut created_case)
                    .await
            }
        };

        match result {
            Ok(case_id) => Ok(Self::complete(ticket, case_id, created_case)),
            Err(e) if !ticket.is_current() => Ok(Self::abandon(ticket, e, created_case)),
            Err(e) => Err(e),
        }
    }

    async fn assign_direct(&self, email_id: &str, case_id: i64) -> Result<()> {
        self.store
            .assign_email(email_id, case_id)
            .await
            .map_err(|e| {
                warn!("Assigning email {} to case {} failed: {}", email_id, case_id, e);
                IntakeError::AssignmentFailed {
                    email_id: email_id.to_string(),
                    case_id,
                    reason: e.to_string(),
                }
            })
    }

    /// Second step after the store created (or failed to create) a case.
    /// The created case lands in `slot` even when the assignment fails.
    async fn assign_new_case(
        &self,
        email_id: &str,
        label: &str,
        created: Result<Case>,
        slot: &mut Option<Case>,
    ) -> Result<i64> {
        let case = created.map_err(|e| {
            warn!("Creating case '{}' for email {} failed: {}", label, email_id, e);
            IntakeError::CaseCreationFailed {
                email_id: email_id.to_string(),
                reason: e.to_string(),
            }
        })?;
        info!(
            "Created case {} ({}) for email {}",
            case.id,
            case.reference_label(),
            email_id
        );

        let assigned = self.assign_created(email_id, &case).await.map(|()| case.id);
        *slot = Some(case);
        assigned
    }

    async fn assign_created(&self, email_id: &str, case: &Case) -> Result<()> {
        self.store
            .assign_email(email_id, case.id)
            .await
            .map_err(|e| {
                warn!(
                    "Case {} was created but assigning email {} to it failed: {}",
                    case.id, email_id, e
                );
                IntakeError::PartialSagaFailure {
                    email_id: email_id.to_string(),
                    case_id: case.id,
                    case_reference: case.reference.clone(),
                    reason: e.to_string(),
                }
            })
    }

    fn complete(ticket: InFlightTicket, case_id: i64, created_case: Option<Case>) -> SagaCompletion {
        let stale = !ticket.is_current();
        let email_id = ticket.email_id().to_string();
        if stale {
            debug!(
                "Email {} left the working set while being assigned to case {}",
                email_id, case_id
            );
        } else {
            info!("Assigned email {} to case {}", email_id, case_id);
        }
        SagaCompletion {
            email_id,
            case_id: Some(case_id),
            created_case,
            assigned: true,
            stale,
        }
    }

    fn abandon(ticket: InFlightTicket, error: IntakeError, created_case: Option<Case>) -> SagaCompletion {
        let email_id = ticket.email_id().to_string();
        let case_id = match (&created_case, &error) {
            (Some(case), _) => Some(case.id),
            (None, IntakeError::AssignmentFailed { case_id, .. }) => Some(*case_id),
            _ => None,
        };
        info!(
            "Email {} left the working set while its assignment was pending; dropping failure: {}",
            email_id, error
        );
        SagaCompletion {
            email_id,
            case_id,
            created_case,
            assigned: false,
            stale: true,
        }
    }
}
