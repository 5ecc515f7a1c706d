mod adapters;
mod config;
mod core;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::core::{
    limit_diff, limit_log, CommitStatus, GitIntegration, Session, SessionError, SessionOutcome,
    StdioPrompter, Transcript,
};

#[derive(Parser)]
#[command(name = "commitgpt")]
#[command(about = "Draft a commit message for the staged changes with a chat model, then pick, refine or commit it", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(help = "Free-form hint added to the conversation (e.g. what the change is for)")]
    hint: Option<String>,

    #[arg(long, help = "Chat model to use (default: gpt-4)")]
    model: Option<String>,

    #[arg(
        short = 'n',
        long,
        value_parser = clap::value_parser!(u16).range(1..=config::MAX_CHOICES as i64),
        help = "Number of candidate messages per round"
    )]
    choices: Option<u16>,

    #[arg(long, help = "Replace the built-in system prompt")]
    prompt: Option<String>,

    #[arg(long, help = "Sampling temperature sent with each request (0.0 to 2.0)")]
    temperature: Option<f32>,

    #[arg(long, help = "Maximum number of git log lines sent")]
    log_lines: Option<usize>,

    #[arg(long, help = "Maximum number of diff lines sent per file")]
    diff_lines_per_file: Option<usize>,

    #[arg(long, help = "Maximum number of diff lines sent in total")]
    diff_total_lines: Option<usize>,

    #[arg(short, long, help = "Enable debug logging on stderr")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration from file and merge with CLI options
    let mut config = config::Config::load()?;
    config.merge_with_cli(config::CliOverrides {
        model: cli.model,
        choices: cli.choices.map(usize::from),
        temperature: cli.temperature,
        system_prompt: cli.prompt,
        log_lines: cli.log_lines,
        diff_lines_per_file: cli.diff_lines_per_file,
        diff_total_lines: cli.diff_total_lines,
    });
    config.normalize();

    // Checked before touching git or the network.
    let Some(api_key) = adapters::llm::resolve_api_key(config.api_key.as_deref()) else {
        println!("{}", adapters::llm::CompletionError::MissingApiKey);
        std::process::exit(1);
    };

    let adapter = adapters::llm::create_adapter(&config.model_config(api_key))?;
    info!("Using model {}", adapter.model_name());

    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!();
            std::process::exit(0);
        }
    });

    let git = GitIntegration::new(".")?;
    let log = limit_log(
        &git.log_summary(config.limits.log_lines)?,
        config.limits.log_lines,
    );
    let staged = git.staged_diff().context("Failed to collect staged changes")?;
    if staged.trim().is_empty() {
        warn!("No staged changes found. Stage your changes with 'git add' first.");
    }
    let diff = limit_diff(&staged, &config.limits);
    debug!(
        "Prompt material: {} log lines, {} of {} diff lines",
        log.lines().count(),
        diff.lines().count(),
        staged.lines().count()
    );

    let transcript = Transcript::new(config.system_prompt(), &log, &diff, cli.hint.as_deref());
    debug!("Initial transcript has {} messages", transcript.messages().len());
    let mut prompter = StdioPrompter::stdio();
    let mut session = Session::new(
        adapter.as_ref(),
        &mut prompter,
        &git,
        transcript,
        config.choices,
    );

    match session.run().await {
        Ok(SessionOutcome::Committed { status, .. }) => {
            if let CommitStatus::Failed { detail } = status {
                debug!("Commit failed: {}", detail);
            }
            Ok(())
        }
        Ok(SessionOutcome::Aborted) => Ok(()),
        Err(SessionError::Interrupted) => {
            println!();
            Ok(())
        }
        Err(SessionError::RequestAborted(err)) => {
            debug!("Giving up after request failure ({:?}): {}", err.kind(), err);
            println!("\nAborting.");
            std::process::exit(1);
        }
        Err(err @ SessionError::Io(_)) => Err(err.into()),
    }
}
