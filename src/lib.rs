//! Case Intake
//!
//! Reconciles a caseworker's unread email with the cases held by an external
//! case store.
//!
//! # Overview
//!
//! - **Reference extraction**: finds a structured case reference such as
//!   `SCC-2025-001` in an email's subject and body
//! - **Case matching**: resolves a reference to the case carrying it
//! - **Assignment saga**: assigns an email to an existing case, or creates a
//!   case and assigns to it, reporting partial failures without retrying
//! - **Intake queue**: the working set of unread emails, with in-flight
//!   tracking that survives reloads
//! - **Case creation**: named cases, or cases the store generates from a
//!   description, with a detail view of any case
//! - **Case assistant**: forwards chat and generation commands for a case
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use case_intake::{client::HttpStoreClient, config::Config, session::IntakeSession};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("case-intake.toml".as_ref()).await?;
//!     let client = Arc::new(HttpStoreClient::from_config(&config.store)?);
//!
//!     let session = IntakeSession::new(client);
//!     session.sync().await?;
//!
//!     let report = session.auto_assign().await?;
//!     println!("{} emails assigned", report.assigned.len());
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`extractor`] - Case reference extraction
//! - [`matcher`] - Reference to case resolution
//! - [`saga`] - Two-step assignment with partial failure reporting
//! - [`queue`] - Working set of unread emails
//! - [`in_flight`] - Per-email in-flight tracking
//! - [`session`] - Orchestration of queue, saga and case list
//! - [`client`] - Case store trait and REST implementation
//! - [`assistant`] - Case assistant commands
//! - [`cli`] - Command-line interface
//! - [`interactive`] - Interactive inbox review
//! - [`config`] - Configuration management
//! - [`error`] - Error types and result aliases
//! - [`models`] - Core data structures

pub mod assistant;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod extractor;
pub mod in_flight;
pub mod interactive;
pub mod matcher;
pub mod models;
pub mod queue;
pub mod saga;
pub mod session;

// Re-export commonly used types for convenience
pub use error::{IntakeError, Result};

// Core data models
pub use models::{
    Case, CaseDetail, CaseDraft, CaseGeneration, Destination, Email, FiledEmail, MatchResult,
    MatchStatus, NewCase, ReferenceToken,
};

// Reconciliation pieces
pub use extractor::{extract, extract_from_email};
pub use in_flight::{InFlightRegistry, InFlightTicket};
pub use matcher::{find_duplicate_references, match_case, DuplicateReference};
pub use queue::IntakeQueue;
pub use saga::{AssignmentSaga, SagaCompletion};
pub use session::{AutoAssignReport, IntakeSession, ReviewItem, SyncSummary};

// Config types
pub use config::{Config, IntakeConfig, StoreConfig};

// Client traits
pub use assistant::{AssistantCommand, AssistantReply, CaseAssistant};
pub use client::{CaseStore, HttpStoreClient};

// CLI types (for binary usage)
pub use cli::{Cli, Commands, ProgressReporter};

// Interactive review types
pub use interactive::{ReviewChoice, ReviewOutcome};
