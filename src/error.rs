use thiserror::Error;

/// Type alias for Result with IntakeError
pub type Result<T> = std::result::Result<T, IntakeError>;

/// Error types for the email intake engine
#[derive(Error, Debug)]
pub enum IntakeError {
    /// Case store returned a non-success status
    #[error("Case store error (HTTP {status}): {message}")]
    Store { status: u16, message: String },

    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network-related error (connection issues, timeouts, etc.)
    #[error("Network error: {0}")]
    Network(String),

    /// Store answered with a body we could not interpret
    #[error("Invalid response from case store: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The email is not part of the current working set
    #[error("Email {0} is not in the working set")]
    EmailNotInWorkingSet(String),

    /// A saga for this email is already running; no store call was made
    #[error("Email {email_id} is already being assigned")]
    AlreadyInFlight { email_id: String },

    /// Case creation failed; nothing was changed in the store
    #[error("Failed to create a case for email {email_id}: {reason}")]
    CaseCreationFailed { email_id: String, reason: String },

    /// Direct assignment failed; the email stays in the working set
    #[error("Failed to assign email {email_id} to case {case_id}: {reason}")]
    AssignmentFailed {
        email_id: String,
        case_id: i64,
        reason: String,
    },

    /// The case was created but the email could not be assigned to it
    #[error(
        "Case {case_id} ({}) was created but email {email_id} could not be assigned to it: {reason}. \
         Assign the email to the existing case to finish",
        .case_reference.as_deref().unwrap_or("no reference")
    )]
    PartialSagaFailure {
        email_id: String,
        case_id: i64,
        case_reference: Option<String>,
        reason: String,
    },

    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IntakeError {
    /// Check if the error is transient (network trouble or a 5xx from the store)
    ///
    /// Nothing in the engine retries on this; it only informs the message shown
    /// to the caseworker.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            IntakeError::Network(_) | IntakeError::Store { status: 500..=599, .. }
        )
    }

    /// Check if the error is a saga outcome the user can act on by retrying
    pub fn is_saga_failure(&self) -> bool {
        matches!(
            self,
            IntakeError::AlreadyInFlight { .. }
                | IntakeError::CaseCreationFailed { .. }
                | IntakeError::AssignmentFailed { .. }
                | IntakeError::PartialSagaFailure { .. }
        )
    }
}

impl From<reqwest::Error> for IntakeError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return IntakeError::Network(format!("Request timed out: {}", error));
        }
        if error.is_connect() || error.is_request() {
            return IntakeError::Network(format!("Connection error: {}", error));
        }
        if error.is_decode() {
            return IntakeError::InvalidResponse(error.to_string());
        }
        match error.status() {
            Some(status) if status.as_u16() == 404 => IntakeError::NotFound(error.to_string()),
            Some(status) => IntakeError::Store {
                status: status.as_u16(),
                message: error.to_string(),
            },
            None => IntakeError::Network(error.to_string()),
        }
    }
}
