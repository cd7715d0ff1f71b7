use anyhow::{bail, Context, Result};
use clap::Parser;
use file_review_agent::{
    agents::{PipelineConfig, PipelineCoordinator},
    config::{load_agent_configs, working_set},
    remote::HttpAgentsClient,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "file-review")]
#[command(about = "Runs reviewer, summarizer and implementer agents over files")]
#[command(version = "0.1.0")]
struct Cli {
    /// Comma-separated list of reviewer agent names
    #[arg(short, long)]
    agents: String,

    /// Agent name that summarizes reviewer findings
    #[arg(short, long)]
    summarizer: Option<String>,

    /// Agent name that applies the findings to the file
    #[arg(short, long)]
    implementer: Option<String>,

    /// Directory holding the agent YAML records
    #[arg(long, default_value = "agents")]
    agents_dir: PathBuf,

    /// Log each agent's feedback as it arrives
    #[arg(short, long)]
    verbose: bool,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// File(s) to process; supports wildcards (e.g. *.md) and multiple files
    #[arg(required = true)]
    patterns: Vec<String>,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = init_tracing(&cli.log_level) {
        eprintln!("Failed to initialize logging: {e:#}");
        std::process::exit(1);
    }

    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing with the specified log level
fn init_tracing(log_level: &str) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(log_level))
        .context("Failed to create env filter")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true),
        )
        .with(env_filter)
        .init();

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let reviewers: Vec<String> = cli
        .agents
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if reviewers.is_empty() {
        bail!("no worker agents specified in --agents");
    }

    let summarizer = cli
        .summarizer
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let implementer = cli
        .implementer
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    info!("Worker agents: {:?}", reviewers);
    info!("Summarizer agent: {:?}", summarizer);
    info!("Implementer agent: {:?}", implementer);

    let files = expand_patterns(&cli.patterns);
    if files.is_empty() {
        bail!("no files found to process");
    }
    info!("Files: {:?}", files);

    // Every fatal configuration check runs before any remote call.
    let names = working_set(&reviewers, summarizer.as_deref(), implementer.as_deref());
    let configs = load_agent_configs(&cli.agents_dir, &names)?;

    let client = Arc::new(HttpAgentsClient::from_env()?);

    let settings = PipelineConfig {
        verbose: cli.verbose,
        ..Default::default()
    };
    let mut coordinator =
        PipelineCoordinator::new(client, configs, reviewers, summarizer, implementer, settings);
    coordinator.run(&files).await
}

/// Expand glob patterns into a flat list of files; directories are skipped
/// with a warning, as are patterns that match nothing.
fn expand_patterns(patterns: &[String]) -> Vec<String> {
    let mut files = Vec::new();
    for pattern in patterns {
        let paths = match glob::glob(pattern) {
            Ok(paths) => paths,
            Err(e) => {
                warn!("Invalid pattern {}: {}", pattern, e);
                continue;
            }
        };

        let mut matched = false;
        for path in paths.filter_map(|p| p.ok()) {
            matched = true;
            if path.is_file() {
                files.push(path.to_string_lossy().into_owned());
            } else if path.is_dir() {
                warn!("Skipping directory: {}", path.display());
            }
        }
        if !matched {
            warn!("No files matched pattern: {}", pattern);
        }
    }
    files
}
