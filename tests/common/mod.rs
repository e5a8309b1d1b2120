//! Common test utilities and fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use case_intake::client::CaseStore;
use case_intake::error::{IntakeError, Result};
use case_intake::models::{Case, CaseDraft, CaseGeneration, Email};
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Create a test email with default values
pub fn create_test_email(id: &str, subject: &str, body: &str) -> Email {
    Email {
        id: id.to_string(),
        sender: "Counsel <counsel@example.com>".to_string(),
        subject: subject.to_string(),
        body: body.to_string(),
        received_at: Utc::now(),
    }
}

/// Create a test case with a reference
pub fn create_test_case(id: i64, name: &str, reference: Option<&str>) -> Case {
    Case {
        id,
        name: name.to_string(),
        reference: reference.map(str::to_string),
        email_count: 0,
    }
}

/// In-memory case store that records every call
///
/// Assignments can be made to fail, to wait on a gate, or to yield once so a
/// concurrent caller gets polled while the call is pending.
#[derive(Default)]
pub struct FakeStore {
    emails: Mutex<Vec<Email>>,
    cases: Mutex<Vec<Case>>,
    next_case_id: AtomicI64,
    pub assign_calls: Mutex<Vec<(String, i64)>>,
    pub create_calls: Mutex<Vec<CaseDraft>>,
    pub generate_calls: Mutex<Vec<CaseGeneration>>,
    pub list_cases_calls: AtomicUsize,
    pub list_emails_calls: AtomicUsize,
    assign_failures: Mutex<VecDeque<IntakeError>>,
    fail_list_cases: AtomicBool,
    assign_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeStore {
    pub fn new(emails: Vec<Email>, cases: Vec<Case>) -> Arc<Self> {
        let next_id = cases.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        let store = Self {
            emails: Mutex::new(emails),
            cases: Mutex::new(cases),
            next_case_id: AtomicI64::new(next_id),
            ..Self::default()
        };
        Arc::new(store)
    }

    /// Make the next assignment call fail with `error`
    pub fn fail_next_assignment(&self, error: IntakeError) {
        self.assign_failures.lock().unwrap().push_back(error);
    }

    pub fn fail_list_cases(&self, fail: bool) {
        self.fail_list_cases.store(fail, Ordering::SeqCst);
    }

    /// Hold every assignment call until the returned gate is notified
    pub fn gate_assignments(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.assign_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Simulate the email being handled elsewhere (read in another client)
    pub fn drop_unread(&self, email_id: &str) {
        self.emails.lock().unwrap().retain(|e| e.id != email_id);
    }

    pub fn add_unread(&self, email: Email) {
        self.emails.lock().unwrap().push(email);
    }

    pub fn stored_cases(&self) -> Vec<Case> {
        self.cases.lock().unwrap().clone()
    }

    pub fn assignments(&self) -> Vec<(String, i64)> {
        self.assign_calls.lock().unwrap().clone()
    }

    pub fn list_cases_count(&self) -> usize {
        self.list_cases_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaseStore for FakeStore {
    async fn list_unread_emails(&self) -> Result<Vec<Email>> {
        self.list_emails_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.emails.lock().unwrap().clone())
    }

    async fn list_cases(&self) -> Result<Vec<Case>> {
        self.list_cases_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list_cases.load(Ordering::SeqCst) {
            return Err(IntakeError::Network("case list unavailable".to_string()));
        }
        Ok(self.cases.lock().unwrap().clone())
    }

    async fn create_case(&self, draft: &CaseDraft) -> Result<Case> {
        self.create_calls.lock().unwrap().push(draft.clone());
        let id = self.next_case_id.fetch_add(1, Ordering::SeqCst);
        let case = Case {
            id,
            name: draft.name.clone(),
            reference: Some(
                draft
                    .reference
                    .clone()
                    .unwrap_or_else(|| format!("SCC-2026-{:03}", id)),
            ),
            email_count: 0,
        };
        self.cases.lock().unwrap().push(case.clone());
        Ok(case)
    }

    async fn generate_case(&self, generation: &CaseGeneration) -> Result<Case> {
        self.generate_calls.lock().unwrap().push(generation.clone());
        let id = self.next_case_id.fetch_add(1, Ordering::SeqCst);
        let case = Case {
            id,
            name: generation.description.clone(),
            reference: Some(format!("SCC-2026-{:03}", id)),
            email_count: generation.num_emails,
        };
        self.cases.lock().unwrap().push(case.clone());
        Ok(case)
    }

    async fn assign_email(&self, email_id: &str, case_id: i64) -> Result<()> {
        let gate = self.assign_gate.lock().unwrap().clone();
        match gate {
            Some(gate) => gate.notified().await,
            None => tokio::task::yield_now().await,
        }

        self.assign_calls
            .lock()
            .unwrap()
            .push((email_id.to_string(), case_id));

        if let Some(error) = self.assign_failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        self.emails.lock().unwrap().retain(|e| e.id != email_id);
        if let Some(case) = self
            .cases
            .lock()
            .unwrap()
            .iter_mut()
            .find(|c| c.id == case_id)
        {
            case.email_count += 1;
        }
        Ok(())
    }
}
