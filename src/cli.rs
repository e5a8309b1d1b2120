//! Command-line interface

use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::assistant::{quick_action, AssistantCommand, AssistantReply, CaseAssistant, QUICK_ACTIONS};
use crate::client::HttpStoreClient;
use crate::config::Config;
use crate::error::{IntakeError, Result};
use crate::models::{Case, CaseDetail, CaseDraft, CaseGeneration, Destination, MatchStatus, NewCase};
use crate::saga::SagaCompletion;
use crate::session::{AutoAssignReport, IntakeSession, ReviewItem};

#[derive(Parser, Debug)]
#[command(name = "case-intake")]
#[command(version = "0.1.0")]
#[command(about = "Reconcile unread email with arbitration cases", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "case-intake.toml")]
    pub config: PathBuf,

    /// Case store base URL (overrides store.base_url)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List cases with their reference and email count
    Cases,

    /// List unread emails with the detected reference and match status
    Inbox,

    /// Assign an email to an existing case
    Assign {
        /// Email id from `inbox`
        #[arg(long)]
        email: String,

        /// Case id from `cases`
        #[arg(long)]
        case: i64,
    },

    /// Create a case and assign the email to it
    AssignNew {
        #[arg(long)]
        email: String,

        #[command(flatten)]
        new_case: NewCaseArgs,
    },

    /// Create a case without assigning any email
    CreateCase {
        #[command(flatten)]
        new_case: NewCaseArgs,
    },

    /// Show a case with its filed emails and parties
    Show {
        #[arg(long)]
        case: i64,
    },

    /// Assign every email whose reference matches a case
    AutoAssign {
        /// Only list what would be assigned
        #[arg(long)]
        dry_run: bool,
    },

    /// Walk through the inbox one email at a time
    Review,

    /// Ask the case assistant a question
    Ask {
        #[arg(long)]
        case: i64,

        /// Question text; pick a quick action when omitted
        message: Option<String>,

        /// Ask the quick-action question with this number, starting at 1
        #[arg(
            long,
            conflicts_with = "message",
            value_parser = clap::value_parser!(u64).range(1..=QUICK_ACTIONS.len() as u64)
        )]
        quick: Option<u64>,
    },

    /// Generate a document for a case
    Generate {
        #[arg(long)]
        case: i64,

        #[arg(value_enum)]
        kind: GenerateKind,
    },

    /// Generate example configuration file
    InitConfig {
        /// Path to create config file
        #[arg(short, long, default_value = "case-intake.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

/// Flags describing a case to create
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct NewCaseArgs {
    /// Name of the new case
    #[arg(long, required_unless_present = "generate", conflicts_with = "generate")]
    pub name: Option<String>,

    /// Case reference; generated by the store when omitted
    #[arg(long, conflicts_with = "generate")]
    pub reference: Option<String>,

    /// Have the store generate the case, with sample emails, from a description
    #[arg(long, value_name = "DESCRIPTION")]
    pub generate: Option<String>,

    /// Emails to generate (with --generate)
    #[arg(long, default_value_t = 10)]
    pub emails: u32,

    /// Days the generated emails span (with --generate)
    #[arg(long, default_value_t = 60)]
    pub days: u32,
}

impl NewCaseArgs {
    pub fn to_new_case(&self) -> NewCase {
        match (&self.generate, &self.name) {
            (Some(description), _) => NewCase::Generated(CaseGeneration {
                description: description.clone(),
                num_emails: self.emails,
                time_span_days: self.days,
            }),
            (None, name) => {
                let mut draft = CaseDraft::new(name.as_deref().unwrap_or_default());
                if let Some(reference) = &self.reference {
                    draft = draft.with_reference(reference.as_str());
                }
                NewCase::Draft(draft)
            }
        }
    }
}

/// Question for `ask`: the message as given, or the chosen quick action
pub fn question_for(message: Option<&str>, quick: Option<u64>) -> Option<String> {
    match (message, quick) {
        (Some(message), _) => Some(message.to_string()),
        (None, Some(number)) => quick_action(number as usize).map(str::to_string),
        (None, None) => None,
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateKind {
    /// Background summary
    Summary,
    /// Draft reply to the latest email
    Draft,
    /// Case analysis framework
    Analysis,
}

impl From<GenerateKind> for AssistantCommand {
    fn from(kind: GenerateKind) -> Self {
        match kind {
            GenerateKind::Summary => AssistantCommand::BackgroundSummary,
            GenerateKind::Draft => AssistantCommand::DraftResponse,
            GenerateKind::Analysis => AssistantCommand::CaseAnalysis,
        }
    }
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub(crate) fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_len.saturating_sub(3)).collect::<String>())
    }
}

/// Progress reporter using indicatif
pub struct ProgressReporter {
    multi: MultiProgress,
    spinner_style: ProgressStyle,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let spinner_style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed:>6}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ");

        Self {
            multi: MultiProgress::new(),
            spinner_style,
        }
    }

    pub fn add_spinner(&self, msg: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(self.spinner_style.clone());
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Finish a spinner and clear it from the multi-progress display
    pub fn finish_spinner(&self, pb: &ProgressBar, msg: &str) {
        pb.finish_and_clear();
        println!("  ✓ {}", msg);
    }

    pub fn fail_spinner(&self, pb: &ProgressBar, msg: &str) {
        pb.finish_and_clear();
        println!("  ✗ {}", msg);
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Lines of advice printed under an error, if there is any to give
pub fn error_hint(error: &IntakeError) -> Option<Vec<String>> {
    let lines = match error {
        IntakeError::Config(_) => vec![
            "Check your configuration file for errors.".to_string(),
            "Run: case-intake init-config --force".to_string(),
        ],
        IntakeError::PartialSagaFailure {
            email_id, case_id, ..
        } => vec![
            format!("Case {} was created but the email is still unassigned.", case_id),
            format!("Retry with: case-intake assign --email {} --case {}", email_id, case_id),
        ],
        e if e.is_transient() => vec![
            "This may be a temporary problem with the case store.".to_string(),
            "Check store.base_url (or --base-url) and try the command again.".to_string(),
        ],
        e if e.is_saga_failure() => vec![
            "Nothing was retried automatically.".to_string(),
            "Run `case-intake inbox` to check the email, then assign it again.".to_string(),
        ],
        _ => return None,
    };
    Some(lines)
}

/// Load the configuration, apply CLI overrides and build the store client
pub async fn connect(cli: &Cli) -> Result<(Config, Arc<HttpStoreClient>)> {
    let mut config = Config::load(&cli.config).await?;
    if let Some(base_url) = &cli.base_url {
        config.store.base_url = base_url.clone();
    }
    config.validate()?;

    let client = HttpStoreClient::from_config(&config.store)?;
    info!("Using case store at {}", client.base_url());
    Ok((config, Arc::new(client)))
}

/// Create a session and load the working set
pub async fn open_session(
    config: &Config,
    client: Arc<HttpStoreClient>,
    reporter: &ProgressReporter,
) -> Result<IntakeSession> {
    let session = IntakeSession::new(client)
        .with_max_concurrent_assignments(config.intake.max_concurrent_assignments);

    let spinner = reporter.add_spinner("Loading unread emails and cases...");
    match session.sync().await {
        Ok(summary) => {
            reporter.finish_spinner(
                &spinner,
                &format!(
                    "Loaded {} unread emails and {} cases",
                    summary.emails, summary.cases
                ),
            );
            Ok(session)
        }
        Err(e) => {
            reporter.fail_spinner(&spinner, "Could not reach the case store");
            Err(e)
        }
    }
}

pub fn format_cases(cases: &[Case]) -> String {
    if cases.is_empty() {
        return "No cases yet.\n".to_string();
    }

    let mut out = String::new();
    out.push_str(&format!("{:>5}  {:<16}  {:>6}  {}\n", "ID", "REFERENCE", "EMAILS", "NAME"));
    for case in cases {
        out.push_str(&format!(
            "{:>5}  {:<16}  {:>6}  {}\n",
            case.id,
            case.reference_label(),
            case.email_count,
            truncate_string(&case.name, 60)
        ));
    }
    out
}

/// One-line description of an email's match state
pub fn describe_match(item: &ReviewItem) -> String {
    let status = match item.match_result.status() {
        MatchStatus::NoReference => "no reference".to_string(),
        MatchStatus::NeedsManualSelection(token) => format!("{} (no matching case)", token),
        MatchStatus::Matched(case_id) => {
            let reference = item
                .match_result
                .token
                .as_ref()
                .map(|t| t.as_str())
                .unwrap_or_default();
            format!("{} -> case {}", reference, case_id)
        }
    };

    if item.in_flight {
        format!("{} [assigning]", status)
    } else {
        status
    }
}

pub fn format_inbox(items: &[ReviewItem], preview_chars: usize) -> String {
    if items.is_empty() {
        return "No unread emails.\n".to_string();
    }

    let mut out = String::new();
    for item in items {
        out.push_str(&format!(
            "[{}] {}\n",
            item.email.id,
            truncate_string(&item.email.subject, 80)
        ));
        out.push_str(&format!(
            "    From: {}  ({})\n",
            item.email.sender,
            item.email.received_at.format("%Y-%m-%d %H:%M")
        ));
        out.push_str(&format!("    Match: {}\n", describe_match(item)));
        let preview = item.email.preview(preview_chars);
        if !preview.trim().is_empty() {
            out.push_str(&format!("    {}\n", preview.replace('\n', " ")));
        }
    }
    out
}

/// Matched emails an auto-assign run would pick up
pub fn plan_auto_assign(items: &[ReviewItem]) -> Vec<(String, Case)> {
    items
        .iter()
        .filter(|item| !item.in_flight)
        .filter_map(|item| {
            item.match_result
                .case
                .clone()
                .map(|case| (item.email.id.clone(), case))
        })
        .collect()
}

pub fn format_auto_assign_report(report: &AutoAssignReport) -> String {
    let mut out = String::new();
    out.push_str("\n========================================\n");
    out.push_str("Auto-assign Summary\n");
    out.push_str("========================================\n");
    out.push_str(&format!("Assigned: {}\n", report.assigned.len()));
    for (email_id, case_id) in &report.assigned {
        out.push_str(&format!("  - {} -> case {}\n", email_id, case_id));
    }
    out.push_str(&format!("Failed: {}\n", report.failed.len()));
    for (email_id, error) in &report.failed {
        out.push_str(&format!("  - {}: {}\n", email_id, error));
    }
    if !report.skipped.is_empty() {
        out.push_str(&format!(
            "Skipped (already assigning): {}\n",
            report.skipped.join(", ")
        ));
    }
    if !report.abandoned.is_empty() {
        out.push_str(&format!(
            "Left the inbox while assigning: {}\n",
            report.abandoned.join(", ")
        ));
    }
    out.push_str(&format!("Without a matching case: {}\n", report.unmatched));
    out.push_str("========================================\n");
    out
}

pub fn format_completion(completion: &SagaCompletion) -> String {
    let mut out = String::new();
    if let Some(case) = &completion.created_case {
        out.push_str(&format!(
            "Created case {} ({}) \"{}\"\n",
            case.id,
            case.reference_label(),
            case.name
        ));
    }
    match (completion.assigned, completion.case_id) {
        (true, Some(case_id)) => out.push_str(&format!(
            "Assigned email {} to case {}\n",
            completion.email_id, case_id
        )),
        _ => out.push_str(&format!(
            "Email {} left the inbox while it was being assigned; nothing to retry\n",
            completion.email_id
        )),
    }
    if completion.stale {
        out.push_str("The inbox was reloaded while this ran; run `inbox` to see the current state.\n");
    }
    out
}

pub fn format_case_detail(detail: &CaseDetail, preview_chars: usize) -> String {
    let case = &detail.case;
    let mut out = String::new();
    out.push_str(&format!("Case {}: {}\n", case.id, case.name));
    out.push_str(&format!("Reference: {}\n", case.reference_label()));
    if detail.parties.is_empty() {
        out.push_str("Parties: none yet\n");
    } else {
        out.push_str(&format!("Parties: {}\n", detail.parties.join(", ")));
    }

    out.push_str(&format!("\nEmails ({}):\n", detail.emails.len()));
    for email in &detail.emails {
        out.push_str(&format!(
            "  [{}] {}  {}\n",
            email.received_at.format("%Y-%m-%d %H:%M"),
            truncate_string(&email.subject, 70),
            email.sender
        ));
        let body = email.body.replace('\n', " ");
        if !body.trim().is_empty() {
            out.push_str(&format!("      {}\n", truncate_string(&body, preview_chars)));
        }
    }
    out
}

pub async fn run_cases(cli: &Cli) -> Result<()> {
    let (_, client) = connect(cli).await?;
    let reporter = ProgressReporter::new();
    let session = IntakeSession::new(client);

    let spinner = reporter.add_spinner("Fetching cases...");
    let cases = session.refresh_cases().await?;
    reporter.finish_spinner(&spinner, &format!("Found {} cases", cases.len()));

    print!("{}", format_cases(&cases));
    Ok(())
}

pub async fn run_inbox(cli: &Cli) -> Result<()> {
    let (config, client) = connect(cli).await?;
    let reporter = ProgressReporter::new();
    let session = open_session(&config, client, &reporter).await?;

    let items = session.review().await?;
    print!("{}", format_inbox(&items, config.intake.preview_chars));
    Ok(())
}

pub async fn run_assign(cli: &Cli, email_id: &str, destination: Destination) -> Result<()> {
    let (config, client) = connect(cli).await?;
    let reporter = ProgressReporter::new();
    let session = open_session(&config, client, &reporter).await?;

    let spinner = reporter.add_spinner(&format!("Assigning email {}...", email_id));
    match session.assign(email_id, destination).await {
        Ok(completion) => {
            if completion.assigned {
                reporter.finish_spinner(&spinner, "Assignment complete");
            } else {
                reporter.fail_spinner(&spinner, "Email left the inbox");
            }
            print!("{}", format_completion(&completion));
            Ok(())
        }
        Err(e) => {
            reporter.fail_spinner(&spinner, "Assignment failed");
            Err(e)
        }
    }
}

pub async fn run_assign_new(cli: &Cli, email_id: &str, new_case: &NewCaseArgs) -> Result<()> {
    run_assign(cli, email_id, new_case.to_new_case().into_destination()).await
}

pub async fn run_create_case(cli: &Cli, new_case: &NewCaseArgs) -> Result<()> {
    let (_, client) = connect(cli).await?;
    let reporter = ProgressReporter::new();
    let session = IntakeSession::new(client);

    let new_case = new_case.to_new_case();
    let spinner = reporter.add_spinner(match &new_case {
        NewCase::Draft(_) => "Creating case...",
        NewCase::Generated(_) => "Generating case and sample emails...",
    });
    let result = match &new_case {
        NewCase::Draft(draft) => session.create_case(draft).await,
        NewCase::Generated(generation) => session.generate_case(generation).await,
    };
    match result {
        Ok(case) => {
            reporter.finish_spinner(
                &spinner,
                &format!("Created case {} ({})", case.id, case.reference_label()),
            );
            print!("{}", format_cases(&[case]));
            Ok(())
        }
        Err(e) => {
            reporter.fail_spinner(&spinner, "Case creation failed");
            Err(e)
        }
    }
}

pub async fn run_show_case(cli: &Cli, case_id: i64) -> Result<()> {
    let (config, client) = connect(cli).await?;
    let reporter = ProgressReporter::new();

    let spinner = reporter.add_spinner(&format!("Fetching case {}...", case_id));
    let detail = match client.get_case_detail(case_id).await {
        Ok(detail) => detail,
        Err(e) => {
            reporter.fail_spinner(&spinner, "Could not fetch the case");
            return Err(e);
        }
    };
    reporter.finish_spinner(&spinner, &format!("{} filed emails", detail.emails.len()));

    print!("{}", format_case_detail(&detail, config.intake.preview_chars));
    Ok(())
}

/// Returns the number of failed assignments
pub async fn run_auto_assign(cli: &Cli, dry_run: bool) -> Result<usize> {
    let (config, client) = connect(cli).await?;
    let reporter = ProgressReporter::new();
    let session = open_session(&config, client, &reporter).await?;

    if dry_run {
        println!("Running in DRY RUN mode - no changes will be made");
        let items = session.review().await?;
        let plan = plan_auto_assign(&items);
        if plan.is_empty() {
            println!("No email matches an existing case.");
        }
        for (email_id, case) in &plan {
            println!(
                "  - {} -> case {} ({}) {}",
                email_id,
                case.id,
                case.reference_label(),
                truncate_string(&case.name, 50)
            );
        }
        println!(
            "{} of {} unread emails would be assigned",
            plan.len(),
            items.len()
        );
        return Ok(0);
    }

    let spinner = reporter.add_spinner("Assigning matched emails...");
    let report = session.auto_assign().await?;
    reporter.finish_spinner(&spinner, "Auto-assign finished");
    print!("{}", format_auto_assign_report(&report));
    Ok(report.failed.len())
}

pub async fn run_assistant(cli: &Cli, case_id: i64, command: AssistantCommand) -> Result<()> {
    let (_, client) = connect(cli).await?;
    let reporter = ProgressReporter::new();

    let spinner = reporter.add_spinner("Waiting for the assistant...");
    let reply: AssistantReply = match client.send(case_id, &command).await {
        Ok(reply) => reply,
        Err(e) => {
            reporter.fail_spinner(&spinner, "Assistant request failed");
            return Err(e);
        }
    };
    let label = reply.model.as_deref().unwrap_or("assistant");
    reporter.finish_spinner(&spinner, &format!("Reply from {}", label));

    println!("\n{}", reply.text);
    Ok(())
}
