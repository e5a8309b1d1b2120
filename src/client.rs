//! Case store client: the request/response contract the intake engine consumes

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::error::{IntakeError, Result};
use crate::models::{Case, CaseDetail, CaseDraft, CaseGeneration, Email};

/// Trait defining case store operations for easier testing
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// List the unread, unassigned emails
    async fn list_unread_emails(&self) -> Result<Vec<Email>>;

    /// List all cases
    async fn list_cases(&self) -> Result<Vec<Case>>;

    /// Create a case and return it with the identity the store assigned
    async fn create_case(&self, draft: &CaseDraft) -> Result<Case>;

    /// Have the store generate a case with sample correspondence
    async fn generate_case(&self, generation: &CaseGeneration) -> Result<Case>;

    /// Associate an email with a case
    async fn assign_email(&self, email_id: &str, case_id: i64) -> Result<()>;
}

#[derive(Deserialize)]
struct EmailsEnvelope {
    #[serde(default)]
    emails: Vec<Email>,
}

#[derive(Deserialize)]
struct CasesEnvelope {
    #[serde(default)]
    cases: Vec<Case>,
}

#[derive(Deserialize)]
struct CaseEnvelope {
    case: Case,
}

#[derive(Deserialize)]
struct CaseDetailEnvelope {
    case: CaseDetail,
}

#[derive(Deserialize)]
struct CreatedCase {
    case_id: i64,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: String,
}

/// REST client for the case backend
pub struct HttpStoreClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpStoreClient {
    /// Create a client for `base_url` with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IntakeError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch a single case by id
    pub async fn get_case(&self, case_id: i64) -> Result<Case> {
        let response = self
            .http
            .get(self.url(&format!("/api/cases/{}", case_id)))
            .send()
            .await?;
        let envelope: CaseEnvelope = check_status(response).await?.json().await?;
        Ok(envelope.case)
    }

    /// Fetch a case together with its filed emails and parties
    pub async fn get_case_detail(&self, case_id: i64) -> Result<CaseDetail> {
        let response = self
            .http
            .get(self.url(&format!("/api/cases/{}", case_id)))
            .send()
            .await?;
        let envelope: CaseDetailEnvelope = check_status(response).await?.json().await?;
        debug!(
            "Case {} has {} filed emails",
            case_id,
            envelope.case.emails.len()
        );
        Ok(envelope.case)
    }

    /// Read a case the store just created. A failed read must not turn into a
    /// failed creation, or the caller could create it twice.
    async fn read_back(&self, case_id: i64, fallback: impl FnOnce() -> Case) -> Case {
        match self.get_case(case_id).await {
            Ok(case) => case,
            Err(e) => {
                warn!("Created case {} but could not read it back: {}", case_id, e);
                fallback()
            }
        }
    }
}

/// Turn a non-success response into an error, using the body's `detail` if any
pub(crate) async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|e| e.detail)
        .unwrap_or_else(|_| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("Unknown").to_string()
            } else {
                body
            }
        });

    if status == StatusCode::NOT_FOUND {
        return Err(IntakeError::NotFound(message));
    }
    Err(IntakeError::Store {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl CaseStore for HttpStoreClient {
    async fn list_unread_emails(&self) -> Result<Vec<Email>> {
        let response = self.http.get(self.url("/api/emails/unread")).send().await?;
        let envelope: EmailsEnvelope = check_status(response).await?.json().await?;
        debug!("Store returned {} unread emails", envelope.emails.len());
        Ok(envelope.emails)
    }

    async fn list_cases(&self) -> Result<Vec<Case>> {
        let response = self.http.get(self.url("/api/cases")).send().await?;
        let envelope: CasesEnvelope = check_status(response).await?.json().await?;
        debug!("Store returned {} cases", envelope.cases.len());
        Ok(envelope.cases)
    }

    async fn create_case(&self, draft: &CaseDraft) -> Result<Case> {
        let response = self
            .http
            .post(self.url("/api/cases"))
            .json(&serde_json::json!({
                "name": draft.name,
                "reference": draft.reference,
            }))
            .send()
            .await?;
        let created: CreatedCase = check_status(response).await?.json().await?;
        debug!("Store created case {}", created.case_id);

        Ok(self
            .read_back(created.case_id, || Case {
                id: created.case_id,
                name: draft.name.clone(),
                reference: draft.reference.clone(),
                email_count: 0,
            })
            .await)
    }

    async fn generate_case(&self, generation: &CaseGeneration) -> Result<Case> {
        let response = self
            .http
            .post(self.url("/api/cases/generate"))
            .json(generation)
            .send()
            .await?;
        let created: CreatedCase = check_status(response).await?.json().await?;
        debug!("Store generated case {}", created.case_id);

        Ok(self
            .read_back(created.case_id, || Case {
                id: created.case_id,
                name: generation.description.clone(),
                reference: None,
                email_count: generation.num_emails,
            })
            .await)
    }

    async fn assign_email(&self, email_id: &str, case_id: i64) -> Result<()> {
        let response = self
            .http
            .post(self.url("/api/emails/assign"))
            .json(&serde_json::json!({
                "email_id": email_id,
                "case_id": case_id,
            }))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}
