//! docflow - terminal client for the document-processing backend
//!
//! Uploads documents for analysis, runs GDPR checks, shares cleared
//! documents and handles sharing approvals, waiting on each backend job
//! with a bounded status poll loop.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (connection, config, invalid input, etc.)
//!   2 - The tracked step failed
//!   3 - Gave up waiting (poll budget exhausted or backend unreachable)

mod api;
mod cli;
mod config;
mod dashboard;
mod error;
mod models;
mod pagination;
mod polling;
mod refresh;
mod report;
mod workflow;

use anyhow::{Context, Result};
use api::{ApiClient, ListQuery};
use chrono::Utc;
use cli::{ApprovalsCommand, Args, Command, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use models::{SharingRequest, Step};
use pagination::{PageInfo, PageRequest};
use polling::PollOutcome;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use workflow::{GdprOutcome, ShareOutcome, Workflow};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("docflow v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .docflow.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to set the backend URL, poll budgets and department directory.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Print `value` as JSON, or the text produced by `text`.
fn emit<T, F>(format: OutputFormat, value: &T, text: F) -> Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce() -> String,
{
    match format {
        OutputFormat::Json => println!("{}", report::generate_json(value)?),
        OutputFormat::Text => print!("{}", text()),
    }
    Ok(())
}

/// Exit code for a finished poll loop.
fn outcome_exit_code(outcome: &PollOutcome) -> i32 {
    if outcome.is_success() {
        0
    } else if matches!(outcome, PollOutcome::Failed { .. }) {
        2
    } else {
        3
    }
}

fn report_outcome(
    format: OutputFormat,
    job_id: &str,
    step: Step,
    outcome: &PollOutcome,
) -> Result<i32> {
    emit(
        format,
        &report::outcome_value(job_id, step, outcome),
        || report::generate_outcome_text(step, outcome),
    )?;
    Ok(outcome_exit_code(outcome))
}

/// Run the selected command. Returns the exit code.
async fn run(args: Args) -> Result<i32> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let Some(command) = args.command.clone() else {
        anyhow::bail!("No command given");
    };
    let format = args.format;

    let client = Arc::new(ApiClient::new(&config.api).context("Failed to create HTTP client")?);
    info!("Backend: {}", client.base_url());
    let show_progress = !args.quiet && format == OutputFormat::Text;
    let workflow = Workflow::new(client.clone(), config.polling.clone(), show_progress);

    match command {
        Command::Analyze {
            file,
            user_id,
            no_wait,
        } => {
            let user_id = user_id.unwrap_or_else(|| config.api.user_id.clone());

            if no_wait {
                let id = workflow.upload(&file, &user_id).await?;
                emit(format, &json!({ "processingId": id }), || {
                    format!(
                        "📤 Uploaded {}\n   Processing id: {}\n   Follow it with `docflow status {} --wait-for analysis`.\n",
                        file.display(),
                        id,
                        id
                    )
                })?;
                return Ok(0);
            }

            if format == OutputFormat::Text {
                println!("📤 Uploading {}...", file.display());
            }
            let (id, outcome) = workflow.analyze(&file, &user_id).await?;
            report_outcome(format, &id, Step::Analysis, &outcome)
        }

        Command::Status { id: None, .. } => {
            let snapshots = client
                .all_statuses()
                .await
                .context("Failed to list job statuses")?;
            emit(format, &snapshots, || {
                report::generate_status_list_text(&snapshots)
            })?;
            Ok(0)
        }

        Command::Status {
            id: Some(id),
            wait_for,
        } => {
            if let Some(step) = wait_for {
                let outcome = workflow.track(&id, step).await?;
                return report_outcome(format, &id, step, &outcome);
            }

            let snapshot = client
                .status(&id)
                .await
                .with_context(|| format!("Failed to get status of {}", id))?;
            emit(format, &snapshot, || report::generate_status_text(&snapshot))?;
            Ok(0)
        }

        Command::Show { id } => {
            let doc = client
                .stored_document(&id)
                .await
                .with_context(|| format!("Failed to load document {}", id))?;
            emit(format, &doc, || report::generate_document_text(&doc))?;
            Ok(0)
        }

        Command::Gdpr { id } => match workflow.run_gdpr(&id).await? {
            GdprOutcome::Immediate(result) => {
                let value = json!({
                    "processingId": id,
                    "step": Step::Gdpr,
                    "outcome": "completed",
                    "result": result,
                });
                emit(format, &value, || {
                    format!(
                        "✅ GDPR check completed\n\n{}",
                        report::generate_gdpr_text(&result)
                    )
                })?;
                Ok(0)
            }
            GdprOutcome::PendingApproval { message } => {
                let value = json!({
                    "processingId": id,
                    "step": Step::Gdpr,
                    "outcome": "pending_approval",
                    "message": message,
                });
                emit(format, &value, || {
                    format!("⏳ GDPR check of {} is waiting for approval: {}\n", id, message)
                })?;
                Ok(0)
            }
            GdprOutcome::Polled(outcome) => report_outcome(format, &id, Step::Gdpr, &outcome),
        },

        Command::GdprList {
            page,
            per_page,
            search,
            all,
        } => {
            let request = PageRequest::new(
                page,
                per_page.unwrap_or(config.display.items_per_page),
            )?;
            let query = ListQuery::page(request).with_search(search);
            let has_analysis = (!all).then_some(true);

            let records = client
                .gdpr_records(&query, has_analysis)
                .await
                .context("Failed to list GDPR records")?;
            let info = PageInfo::new(request, records.total());

            emit(
                format,
                &json!({ "page": info, "data": records.data }),
                || report::generate_documents_text("🛡️  GDPR records", &records.data, Some(&info)),
            )?;
            Ok(0)
        }

        Command::GdprShow { id } => {
            let doc = client
                .gdpr_record(&id)
                .await
                .with_context(|| format!("Failed to load GDPR record {}", id))?;
            emit(format, &doc, || report::generate_document_text(&doc))?;
            Ok(0)
        }

        Command::Share {
            id,
            to,
            department,
            user_id,
        } => {
            let recipients = workflow::resolve_recipients(&to, department.as_deref(), &config)?;
            info!("Sharing {} with {} recipient(s)", id, recipients.len());

            let user_id = user_id.unwrap_or_else(|| config.api.user_id.clone());
            let request = SharingRequest::new(&id, &recipients, department, user_id);

            match workflow.share(&request).await? {
                ShareOutcome::PendingApproval { message } => {
                    let value = json!({
                        "processingId": id,
                        "step": Step::Sharing,
                        "outcome": "pending_approval",
                        "message": message,
                    });
                    emit(format, &value, || {
                        format!(
                            "⏳ Sharing of {} is waiting for approval: {}\n   Follow it with `docflow approvals list --status pending`.\n",
                            id, message
                        )
                    })?;
                    Ok(0)
                }
                ShareOutcome::Polled(outcome) => {
                    report_outcome(format, &id, Step::Sharing, &outcome)
                }
            }
        }

        Command::Files {
            filter,
            page,
            per_page,
            search,
        } => {
            let request = PageRequest::new(
                page,
                per_page.unwrap_or(config.display.items_per_page),
            )?;
            let docs = workflow.select_files(filter, search).await?;
            let info = PageInfo::new(request, docs.len() as u64);
            let shown = request.slice(&docs);

            emit(
                format,
                &json!({ "filter": filter.to_string(), "page": info, "data": shown }),
                || {
                    report::generate_documents_text(
                        &format!("📁 Completed documents ({})", filter),
                        shown,
                        Some(&info),
                    )
                },
            )?;
            Ok(0)
        }

        Command::Approvals { action } => run_approvals(action, &workflow, &config, format).await,

        Command::Stats { watch } => {
            if watch {
                workflow
                    .watch_stats(config.refresh.stats_period(), move |stats| {
                        if format == OutputFormat::Text {
                            println!("── {} ──", Utc::now().format("%H:%M:%S"));
                        }
                        if let Err(e) = emit(format, &stats, || report::generate_stats_text(&stats)) {
                            warn!("Failed to print statistics: {}", e);
                        }
                    })
                    .await?;
                return Ok(0);
            }

            let stats = workflow.stats().await.context("Failed to load statistics")?;
            emit(format, &stats, || report::generate_stats_text(&stats))?;
            Ok(0)
        }
    }
}

async fn run_approvals(
    action: ApprovalsCommand,
    workflow: &Workflow,
    config: &Config,
    format: OutputFormat,
) -> Result<i32> {
    match action {
        ApprovalsCommand::List { status, watch } => {
            if watch {
                workflow
                    .watch_approvals(status, config.refresh.approvals_period(), move |list| {
                        if format == OutputFormat::Text {
                            println!("── {} ──", Utc::now().format("%H:%M:%S"));
                        }
                        if let Err(e) =
                            emit(format, &list, || report::generate_approvals_text(&list))
                        {
                            warn!("Failed to print approvals: {}", e);
                        }
                    })
                    .await?;
                return Ok(0);
            }

            let list = workflow
                .client()
                .approvals(status)
                .await
                .context("Failed to list approvals")?;
            emit(format, &list, || report::generate_approvals_text(&list))?;
            Ok(0)
        }

        ApprovalsCommand::Approve { key, by } => {
            let approver = by.unwrap_or_else(|| config.display.approver.clone());
            workflow.approve(&key, &approver).await?;
            emit(
                format,
                &json!({ "uniqueKey": key, "approved": true, "approvedBy": approver }),
                || format!("✅ Approved {} as {}\n", key, approver),
            )?;
            Ok(0)
        }

        ApprovalsCommand::Reject { key, reason, by } => {
            let rejecter = by.unwrap_or_else(|| config.display.approver.clone());
            workflow.reject(&key, &rejecter, &reason).await?;
            emit(
                format,
                &json!({
                    "uniqueKey": key,
                    "approved": false,
                    "rejectedBy": rejecter,
                    "reason": reason.trim(),
                }),
                || format!("❌ Rejected {} as {}: {}\n", key, rejecter, reason.trim()),
            )?;
            Ok(0)
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
