use anyhow::Result;
use case_intake::assistant::AssistantCommand;
use case_intake::cli::{self, Cli, Commands, ProgressReporter};
use case_intake::config::Config;
use case_intake::error::IntakeError;
use case_intake::interactive;
use case_intake::models::Destination;
use clap::Parser;
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Exit with proper code on error
    if let Err(e) = run().await {
        display_error(&e);
        process::exit(1);
    }
}

fn init_tracing(cli: &Cli) {
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("case_intake=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("case_intake=info,warn"))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    tracing::debug!("case-intake starting");

    match &cli.command {
        Commands::Cases => cli::run_cases(&cli).await?,

        Commands::Inbox => cli::run_inbox(&cli).await?,

        Commands::Assign { email, case } => {
            cli::run_assign(&cli, email, Destination::AssignToExisting(*case)).await?
        }

        Commands::AssignNew { email, new_case } => cli::run_assign_new(&cli, email, new_case).await?,

        Commands::CreateCase { new_case } => cli::run_create_case(&cli, new_case).await?,

        Commands::Show { case } => cli::run_show_case(&cli, *case).await?,

        Commands::AutoAssign { dry_run } => {
            let failed = cli::run_auto_assign(&cli, *dry_run).await?;
            if failed > 0 {
                anyhow::bail!("{} assignments failed", failed);
            }
        }

        Commands::Review => {
            let (config, client) = cli::connect(&cli).await?;
            let reporter = ProgressReporter::new();
            let session = cli::open_session(&config, client, &reporter).await?;
            tracing::info!(session = %session.session_id(), "Starting inbox review");

            let outcome = interactive::run_review(&session, config.intake.preview_chars).await?;
            if outcome.failed > 0 {
                anyhow::bail!("{} assignments failed during review", outcome.failed);
            }
        }

        Commands::Ask {
            case,
            message,
            quick,
        } => {
            let question = match cli::question_for(message.as_deref(), *quick) {
                Some(question) => Some(question),
                None => interactive::pick_quick_action()?,
            };
            match question {
                Some(question) => {
                    cli::run_assistant(&cli, *case, AssistantCommand::Ask(question)).await?
                }
                None => println!("Nothing asked."),
            }
        }

        Commands::Generate { case, kind } => {
            cli::run_assistant(&cli, *case, AssistantCommand::from(*kind)).await?
        }

        Commands::InitConfig { output, force } => {
            tracing::info!("Generating example configuration file");

            if output.exists() && !force {
                return Err(IntakeError::Config(format!(
                    "Configuration file already exists at {:?}. Use --force to overwrite.",
                    output
                ))
                .into());
            }

            Config::create_example(output).await?;

            println!("Created example configuration file at: {:?}", output);
            println!("\nKey settings to review:");
            println!("  - store.base_url: Where the case store API listens");
            println!("  - store.timeout_secs: Per-request timeout");
            println!("  - intake.max_concurrent_assignments: Parallel sagas during auto-assign");
        }
    }

    Ok(())
}

/// Display error with context
fn display_error(error: &anyhow::Error) {
    eprintln!("Error: {}", error);

    let mut cause = error.source();
    while let Some(e) = cause {
        eprintln!("  Caused by: {}", e);
        cause = e.source();
    }

    if let Some(hint) = error.downcast_ref::<IntakeError>().and_then(cli::error_hint) {
        eprintln!("\nHint: {}", hint.join("\n      "));
    }
}
