// Terminal front-end for relay workflows.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use relay_logging::{LevelFilter, LogDestination};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use workflow_app::{Driver, HttpRelayClient};
use workflow_core::{AppState, AppViewModel, FormData, Msg, WorkflowKind, WorkflowPhase};

#[derive(Parser)]
#[command(name = "workflow_app")]
#[command(about = "Run a relay workflow from the terminal: submit the form, review, finish")]
#[command(version)]
struct Cli {
    /// Relay server base URL
    #[arg(long, env = "RELAY_URL", default_value = "http://localhost:3001")]
    relay_url: String,

    /// Workflow to run (setupWithoutKeywords, setupWithKeywords, articleGeneration)
    #[arg(long, short, default_value = "setupWithoutKeywords")]
    workflow: WorkflowKind,

    /// Form field as name=value; repeatable
    #[arg(long = "field", short = 'f', value_parser = parse_field)]
    fields: Vec<(String, String)>,

    /// File to upload with the form
    #[arg(long)]
    file: Option<PathBuf>,

    /// Give up waiting for the workflow after this many seconds
    #[arg(long, env = "WORKFLOW_DEADLINE_SECS")]
    deadline_secs: Option<u64>,

    /// Timeout for a single relay request in seconds
    #[arg(long, default_value = "700")]
    request_timeout_secs: u64,

    /// Where logs go: terminal, file, or both
    #[arg(long, default_value = "file")]
    log: LogDestination,

    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("field name missing in '{raw}'"));
    }
    Ok((name.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    relay_logging::initialize(cli.log, cli.log_level, "workflow_app.log");

    let api = HttpRelayClient::new(
        &cli.relay_url,
        Duration::from_secs(cli.request_timeout_secs),
    )
    .context("failed to build relay client")?;
    let mut state = AppState::new();
    if let Some(secs) = cli.deadline_secs {
        state = state.with_poll_deadline(Duration::from_secs(secs));
    }
    let mut driver = Driver::new(Arc::new(api), state);
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    println!("Starting {} workflow via {}", cli.workflow.label(), cli.relay_url);
    driver.dispatch(Msg::WorkflowSelected(cli.workflow));
    driver
        .run_until(|view| view.session.as_ref().is_some_and(|s| !s.initializing))
        .await;
    print_notice(&mut driver);

    driver.dispatch(Msg::FormSubmitted(FormData {
        fields: cli.fields,
        file: cli.file,
    }));
    println!("Form sent, waiting for the workflow...");

    loop {
        let view = driver.run_until(|view| !is_waiting(view)).await;
        print_notice(&mut driver);
        let Some(session) = view.session else {
            bail!("workflow session ended unexpectedly");
        };

        match session.phase {
            WorkflowPhase::Outline | WorkflowPhase::Article => {
                let (label, content) = if session.phase == WorkflowPhase::Outline {
                    ("Outline", session.outline.unwrap_or_default())
                } else {
                    ("Article", session.article.unwrap_or_default())
                };
                println!("\n----- {label} -----\n{content}\n-------------------");
                let feedback = prompt(&mut stdin, "Feedback (empty line accepts as is): ").await?;
                driver.dispatch(Msg::FeedbackSubmitted {
                    feedback,
                    edited: None,
                });
                println!("Feedback sent, waiting for the workflow...");
            }
            WorkflowPhase::Feedback => {
                println!(
                    "Fill in the feedback sheet: {}",
                    session.feedback_sheet_url.unwrap_or_default()
                );
                prompt(&mut stdin, "Press Enter when done: ").await?;
                driver.dispatch(Msg::ContinueClicked);
                println!("Continuing, waiting for the final result...");
            }
            WorkflowPhase::Complete => {
                println!(
                    "Workflow complete: {}",
                    session.completion_url.unwrap_or_default()
                );
                return Ok(());
            }
            WorkflowPhase::Error => {
                bail!(session.error.unwrap_or_else(|| "workflow failed".to_string()));
            }
            WorkflowPhase::Form => {
                bail!("the relay rejected the submission; check the form fields");
            }
            WorkflowPhase::Loading | WorkflowPhase::FinalLoading => {}
        }
    }
}

fn is_waiting(view: &AppViewModel) -> bool {
    view.phase().is_some_and(WorkflowPhase::is_loading)
}

fn print_notice(driver: &mut Driver) {
    if let Some(notice) = driver.take_notice() {
        println!("* {notice}");
    }
}

async fn prompt(stdin: &mut Lines<BufReader<Stdin>>, text: &str) -> Result<String> {
    println!("{text}");
    let line = stdin
        .next_line()
        .await
        .context("failed to read from stdin")?
        .context("stdin closed")?;
    Ok(line.trim().to_string())
}
