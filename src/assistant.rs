//! Forwarding of chat and generation commands to the case assistant backend
//!
//! The assistant is an external service. Commands go out as opaque text and
//! whatever text comes back is handed to the caller unchanged.

use async_trait::async_trait;
use serde::Deserialize;

use crate::client::{check_status, HttpStoreClient};
use crate::error::Result;

/// Prompts behind the dashboard's quick-action buttons
pub const QUICK_ACTIONS: &[&str] = &[
    "What are the upcoming deadlines?",
    "Summarize the latest submissions",
    "Which SCC rules apply to this procedural issue?",
    "Estimate the arbitration costs",
];

/// Quick action by its 1-based number
pub fn quick_action(number: usize) -> Option<&'static str> {
    number.checked_sub(1).and_then(|index| QUICK_ACTIONS.get(index).copied())
}

/// A command for the assistant, scoped to one case
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistantCommand {
    /// Free-form question about the case
    Ask(String),
    /// Background summary of the case
    BackgroundSummary,
    /// Draft reply to the latest email in the case
    DraftResponse,
    /// Case analysis framework
    CaseAnalysis,
}

impl AssistantCommand {
    /// Backend path for this command
    pub fn path(&self) -> &'static str {
        match self {
            AssistantCommand::Ask(_) => "/api/chat",
            AssistantCommand::BackgroundSummary => "/api/generate/background-summary",
            AssistantCommand::DraftResponse => "/api/generate/email-response",
            AssistantCommand::CaseAnalysis => "/api/generate/case-analysis",
        }
    }

    fn message(&self) -> &str {
        match self {
            AssistantCommand::Ask(text) => text,
            _ => "",
        }
    }
}

/// Text returned by the assistant
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssistantReply {
    #[serde(rename = "response")]
    pub text: String,
    #[serde(default)]
    pub model: Option<String>,
}

#[async_trait]
pub trait CaseAssistant: Send + Sync {
    async fn send(&self, case_id: i64, command: &AssistantCommand) -> Result<AssistantReply>;
}

#[async_trait]
impl CaseAssistant for HttpStoreClient {
    async fn send(&self, case_id: i64, command: &AssistantCommand) -> Result<AssistantReply> {
        tracing::debug!("Forwarding {:?} for case {}", command.path(), case_id);
        let response = self
            .http()
            .post(self.url(command.path()))
            .json(&serde_json::json!({
                "case_id": case_id,
                "message": command.message(),
            }))
            .send()
            .await?;
        let reply: AssistantReply = check_status(response).await?.json().await?;
        Ok(reply)
    }
}
