use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A case file that emails are organised under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    pub id: i64,
    #[serde(alias = "case_name")]
    pub name: String,
    #[serde(default, alias = "case_reference")]
    pub reference: Option<String>,
    #[serde(default)]
    pub email_count: u32,
}

impl Case {
    /// Reference for display, "No ref" when the case has none
    pub fn reference_label(&self) -> &str {
        self.reference.as_deref().unwrap_or("No ref")
    }
}

/// An unread, not yet assigned email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub id: String,
    pub sender: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(
        alias = "date",
        default = "Utc::now",
        deserialize_with = "deserializers::deserialize_header_date"
    )]
    pub received_at: DateTime<Utc>,
}

impl Email {
    /// Text scanned for a case reference: subject and body joined by a space
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.subject, self.body)
    }

    /// First `max_chars` characters of the body (UTF-8 safe)
    pub fn preview(&self, max_chars: usize) -> String {
        if self.body.chars().count() <= max_chars {
            self.body.clone()
        } else {
            format!("{}...", self.body.chars().take(max_chars).collect::<String>())
        }
    }
}

/// Structured case reference found in email text, e.g. `SCC-2025-001`
///
/// Keeps the casing it was found with; comparison against stored references
/// goes through [`ReferenceToken::matches`], which ignores ASCII case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceToken(String);

impl ReferenceToken {
    pub(crate) fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact token equality, ignoring case
    pub fn matches(&self, reference: &str) -> bool {
        self.0.eq_ignore_ascii_case(reference)
    }
}

impl fmt::Display for ReferenceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-email match state derived from the current case set
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchResult {
    pub token: Option<ReferenceToken>,
    pub case: Option<Case>,
}

/// How the caseworker should treat an email given its [`MatchResult`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchStatus {
    /// No reference in the text; manual selection or a new case
    NoReference,
    /// Reference found but no case carries it; needs manual selection
    NeedsManualSelection(ReferenceToken),
    /// Reference found and a case carries it
    Matched(i64),
}

impl MatchResult {
    pub fn status(&self) -> MatchStatus {
        match (&self.token, &self.case) {
            (_, Some(case)) => MatchStatus::Matched(case.id),
            (Some(token), None) => MatchStatus::NeedsManualSelection(token.clone()),
            (None, None) => MatchStatus::NoReference,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.case.is_some()
    }
}

/// Input for creating a case; the store generates a reference when none is given
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseDraft {
    pub name: String,
    #[serde(default)]
    pub reference: Option<String>,
}

impl CaseDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// Input for having the store generate a populated demo case from a description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseGeneration {
    pub description: String,
    /// Number of emails the store generates for the case
    #[serde(default = "default_generated_emails")]
    pub num_emails: u32,
    /// Days the generated correspondence is spread over
    #[serde(default = "default_generated_days", rename = "time_span")]
    pub time_span_days: u32,
}

fn default_generated_emails() -> u32 {
    10
}

fn default_generated_days() -> u32 {
    60
}

impl CaseGeneration {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            num_emails: default_generated_emails(),
            time_span_days: default_generated_days(),
        }
    }
}

/// Where an email should end up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Assign to a case that already exists
    AssignToExisting(i64),
    /// Create the case first, then assign to the identity the store returns
    CreateThenAssign(CaseDraft),
    /// Have the store generate a case, then assign to it
    GenerateThenAssign(CaseGeneration),
}

/// A case to create: named by the caseworker, or generated by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewCase {
    Draft(CaseDraft),
    Generated(CaseGeneration),
}

impl NewCase {
    /// Saga destination that creates this case and assigns to it
    pub fn into_destination(self) -> Destination {
        match self {
            NewCase::Draft(draft) => Destination::CreateThenAssign(draft),
            NewCase::Generated(generation) => Destination::GenerateThenAssign(generation),
        }
    }
}

/// An email already filed under a case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiledEmail {
    pub id: i64,
    pub sender: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(
        default = "Utc::now",
        deserialize_with = "deserializers::deserialize_header_date"
    )]
    pub received_at: DateTime<Utc>,
}

/// A case with its filed emails and the senders involved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseDetail {
    #[serde(flatten)]
    pub case: Case,
    #[serde(default)]
    pub emails: Vec<FiledEmail>,
    #[serde(default)]
    pub parties: Vec<String>,
}

/// Custom deserializers for store payloads
pub mod deserializers {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    /// Parse an RFC 2822 header date, falling back to RFC 3339 and then to
    /// the store's own `YYYY-MM-DD HH:MM:SS` timestamps (taken as UTC)
    pub fn parse_header_date(value: &str) -> Option<DateTime<Utc>> {
        let value = value.trim();
        DateTime::parse_from_rfc2822(value)
            .or_else(|_| DateTime::parse_from_rfc3339(value))
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }

    /// Deserialize an email date header; missing or unparseable dates become "now"
    pub fn deserialize_header_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<String> = Option::deserialize(deserializer)?;
        Ok(opt
            .as_deref()
            .and_then(parse_header_date)
            .unwrap_or_else(Utc::now))
    }
}
