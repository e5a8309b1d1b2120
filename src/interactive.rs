//! Interactive inbox review
//!
//! Walks the working set one email at a time. Emails whose reference matches a
//! case are assigned straight away; every other email gets a picker with the
//! current case list, entries for a new or generated case, and skip/quit. A
//! failed assignment brings the picker back with a refreshed case list.

use inquire::validator::ValueRequiredValidator;
use inquire::{CustomType, InquireError, Select, Text};
use std::fmt;
use tracing::{debug, warn};

use crate::assistant::QUICK_ACTIONS;
use crate::cli::truncate_string;
use crate::error::{IntakeError, Result};
use crate::models::{Case, CaseDraft, CaseGeneration, Destination, MatchStatus};
use crate::saga::SagaCompletion;
use crate::session::{IntakeSession, ReviewItem};

/// What the caseworker picked for one email
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewChoice {
    Existing(i64),
    CreateNew,
    GenerateNew,
    Skip,
    Quit,
}

/// Picker entry shown by `inquire`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewOption {
    pub label: String,
    pub choice: ReviewChoice,
}

impl fmt::Display for ReviewOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Tally of one review pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReviewOutcome {
    pub auto_assigned: usize,
    pub assigned: usize,
    pub cases_created: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ReviewOutcome {
    /// Count an email the caseworker moved past without assigning it
    fn leave_unassigned(&mut self, after_failure: bool) {
        if after_failure {
            self.failed += 1;
        } else {
            self.skipped += 1;
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} auto-assigned, {} assigned manually, {} new cases, {} skipped, {} failed",
            self.auto_assigned, self.assigned, self.cases_created, self.skipped, self.failed
        )
    }
}

/// Picker entries for an email without a matching case, in store order
pub fn build_options(cases: &[Case]) -> Vec<ReviewOption> {
    let mut options: Vec<ReviewOption> = cases
        .iter()
        .map(|case| ReviewOption {
            label: format!(
                "{} ({}, {} emails)",
                truncate_string(&case.name, 50),
                case.reference_label(),
                case.email_count
            ),
            choice: ReviewChoice::Existing(case.id),
        })
        .collect();

    options.push(ReviewOption {
        label: "+ Create new case...".to_string(),
        choice: ReviewChoice::CreateNew,
    });
    options.push(ReviewOption {
        label: "+ Generate case from a description...".to_string(),
        choice: ReviewChoice::GenerateNew,
    });
    options.push(ReviewOption {
        label: "Skip".to_string(),
        choice: ReviewChoice::Skip,
    });
    options.push(ReviewOption {
        label: "Quit review".to_string(),
        choice: ReviewChoice::Quit,
    });
    options
}

/// `None` when the user cancelled the prompt
fn prompt_result<T>(result: std::result::Result<T, InquireError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(InquireError::OperationCanceled) | Err(InquireError::OperationInterrupted) => Ok(None),
        Err(InquireError::IO(e)) => Err(IntakeError::Io(e)),
        Err(e) => Err(IntakeError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            e.to_string(),
        ))),
    }
}

fn prompt_draft(item: &ReviewItem) -> Result<Option<CaseDraft>> {
    let name = Text::new("Case name:")
        .with_validator(ValueRequiredValidator::default())
        .prompt();
    let Some(name) = prompt_result(name)? else {
        return Ok(None);
    };

    let detected = item.match_result.token.as_ref().map(|t| t.to_string());
    let mut reference = Text::new("Case reference:")
        .with_help_message("Leave empty to have one generated");
    if let Some(detected) = detected.as_deref() {
        reference = reference.with_initial_value(detected);
    }
    let Some(reference) = prompt_result(reference.prompt())? else {
        return Ok(None);
    };

    let draft = CaseDraft::new(name.trim());
    let reference = reference.trim();
    Ok(Some(if reference.is_empty() {
        draft
    } else {
        draft.with_reference(reference)
    }))
}

fn prompt_generation() -> Result<Option<CaseGeneration>> {
    let description = Text::new("Describe the case:")
        .with_validator(ValueRequiredValidator::default())
        .prompt();
    let Some(description) = prompt_result(description)? else {
        return Ok(None);
    };

    let mut generation = CaseGeneration::new(description.trim());
    let num_emails = CustomType::<u32>::new("Emails to generate:")
        .with_default(generation.num_emails)
        .prompt();
    let Some(num_emails) = prompt_result(num_emails)? else {
        return Ok(None);
    };
    generation.num_emails = num_emails;
    Ok(Some(generation))
}

/// Pick one of the assistant's quick-action questions; `None` when cancelled
pub fn pick_quick_action() -> Result<Option<String>> {
    let picked = Select::new("Ask the assistant:", QUICK_ACTIONS.to_vec()).prompt();
    Ok(prompt_result(picked)?.map(str::to_string))
}

fn print_item(item: &ReviewItem, position: usize, total: usize, preview_chars: usize) {
    println!("\n----------------------------------------");
    println!("[{}/{}] {}", position, total, item.email.subject);
    println!("From: {}", item.email.sender);
    println!("Date: {}", item.email.received_at.format("%Y-%m-%d %H:%M"));
    let preview = item.email.preview(preview_chars);
    if !preview.trim().is_empty() {
        println!("\n{}\n", preview);
    }
}

/// How one assignment attempt left the email
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssignAttempt {
    Assigned,
    /// Failed; the email is still in the inbox and can be retried
    Retry,
    /// The email left the inbox; nothing more to do for it
    Gone,
}

impl AssignAttempt {
    fn from_result(result: &Result<SagaCompletion>) -> Self {
        match result {
            Ok(completion) if completion.assigned => AssignAttempt::Assigned,
            Ok(_) | Err(IntakeError::EmailNotInWorkingSet(_)) => AssignAttempt::Gone,
            // Nothing is retried automatically; the email stays in the inbox
            Err(_) => AssignAttempt::Retry,
        }
    }
}

/// Run one saga and report how it went
async fn assign(
    session: &IntakeSession,
    email_id: &str,
    destination: Destination,
    outcome: &mut ReviewOutcome,
) -> AssignAttempt {
    let result = session.assign(email_id, destination).await;
    match &result {
        Ok(completion) => {
            if let Some(case) = &completion.created_case {
                outcome.cases_created += 1;
                println!("  ✓ Created case {} ({})", case.name, case.reference_label());
            }
            match completion.case_id {
                Some(case_id) if completion.assigned => {
                    println!("  ✓ Assigned to case {}", case_id)
                }
                _ => println!("  - The email left the inbox while it was being assigned"),
            }
        }
        Err(IntakeError::EmailNotInWorkingSet(_)) => {
            debug!("Email {} left the inbox during review", email_id);
        }
        Err(e) => {
            if let IntakeError::PartialSagaFailure { case_id, .. } = e {
                outcome.cases_created += 1;
                println!(
                    "  ! Case {} was created but the email is still unassigned; pick it from the list to retry",
                    case_id
                );
            }
            warn!("Assignment of {} failed: {}", email_id, e);
            println!("  ✗ {}", e);
        }
    }
    AssignAttempt::from_result(&result)
}

/// Review every email of the working set
pub async fn run_review(session: &IntakeSession, preview_chars: usize) -> Result<ReviewOutcome> {
    let email_ids: Vec<String> = session
        .review()
        .await?
        .into_iter()
        .map(|item| item.email.id)
        .collect();
    let total = email_ids.len();
    let mut outcome = ReviewOutcome::default();

    for (index, email_id) in email_ids.iter().enumerate() {
        // Matches are derived again for every email; a case created for an
        // earlier email can turn this one into a match
        let Some(current) = session
            .review()
            .await?
            .into_iter()
            .find(|item| &item.email.id == email_id)
        else {
            debug!("Email {} left the inbox during review", email_id);
            outcome.skipped += 1;
            continue;
        };
        let item = &current;
        print_item(item, index + 1, total, preview_chars);

        let mut after_failure = false;
        match item.match_result.status() {
            MatchStatus::Matched(case_id) => {
                println!(
                    "Reference {} matches case {}",
                    item.match_result
                        .token
                        .as_ref()
                        .map(|t| t.as_str())
                        .unwrap_or_default(),
                    case_id
                );
                match assign(session, &item.email.id, Destination::AssignToExisting(case_id), &mut outcome).await {
                    AssignAttempt::Assigned => {
                        outcome.auto_assigned += 1;
                        continue;
                    }
                    AssignAttempt::Gone => {
                        outcome.skipped += 1;
                        continue;
                    }
                    AssignAttempt::Retry => {
                        after_failure = true;
                        println!("Pick a case to retry, or skip this email");
                    }
                }
            }
            MatchStatus::NeedsManualSelection(token) => {
                println!("Reference {} does not match any case", token);
            }
            MatchStatus::NoReference => {}
        }

        loop {
            // Rebuilt on every pass so a case created by a failed attempt shows up
            let options = build_options(&session.cases().await);
            let picked = Select::new("Assign to:", options).with_page_size(12).prompt();
            let choice = match prompt_result(picked)? {
                Some(option) => option.choice,
                None => ReviewChoice::Quit,
            };

            let destination = match choice {
                ReviewChoice::Existing(case_id) => Destination::AssignToExisting(case_id),
                ReviewChoice::CreateNew => match prompt_draft(item)? {
                    Some(draft) => Destination::CreateThenAssign(draft),
                    None => continue,
                },
                ReviewChoice::GenerateNew => match prompt_generation()? {
                    Some(generation) => Destination::GenerateThenAssign(generation),
                    None => continue,
                },
                ReviewChoice::Skip => {
                    outcome.leave_unassigned(after_failure);
                    break;
                }
                ReviewChoice::Quit => {
                    if after_failure {
                        outcome.failed += 1;
                    }
                    println!("\nReview stopped: {}", outcome.summary());
                    return Ok(outcome);
                }
            };

            match assign(session, &item.email.id, destination, &mut outcome).await {
                AssignAttempt::Assigned => {
                    outcome.assigned += 1;
                    break;
                }
                AssignAttempt::Gone => {
                    outcome.skipped += 1;
                    break;
                }
                AssignAttempt::Retry => after_failure = true,
            }
        }
    }

    println!("\nReview complete: {}", outcome.summary());
    Ok(outcome)
}
