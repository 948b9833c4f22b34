//! offgrid command-line interface.
//!
//! Drives the same worker as the MCP server against the configured cache
//! database, one event per invocation.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use offgrid_client::{ControlMessage, ControlReply, Event, EventOutcome, FetchClient, FetchConfig, LocalHost, Worker, WorkerConfig};
use offgrid_core::{AppConfig, CacheDb, Request};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "offgrid")]
#[command(about = "Network-first offline cache engine", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Populate the current generation from the manifest
    Install,

    /// Delete every generation except the current one
    Activate,

    /// Install then activate
    Start,

    /// Fetch a URL through the interceptor
    Fetch {
        /// Absolute URL or path relative to the origin
        url: String,

        /// Treat the request as a page navigation
        #[arg(short, long)]
        navigate: bool,

        /// HTTP method
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Print the response body
        #[arg(short, long)]
        body: bool,
    },

    /// Print the current generation name
    Version,

    /// Delete every generation, the current one included
    Clear,

    /// Fetch and store the given URLs in the current generation
    CacheUrls {
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// List stored generations with their entry counts
    Generations,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "offgrid=debug,offgrid_client=debug,offgrid_core=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}

async fn build_worker(config: &AppConfig) -> Result<Worker> {
    let store = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open cache at {}", config.db_path.display()))?;
    let network = FetchClient::new(FetchConfig::from(config))?;
    Ok(Worker::new(WorkerConfig::try_from(config)?, Arc::new(store), Arc::new(network), Arc::new(LocalHost::new())))
}

fn print_reply(reply: Option<ControlReply>) -> Result<()> {
    match reply {
        Some(ControlReply::CacheCleared { success: false, error }) | Some(ControlReply::UrlsCached { success: false, error }) => {
            bail!(error.unwrap_or_else(|| "operation failed".into()))
        }
        Some(reply) => println!("{}", serde_json::to_string(&reply)?),
        None => println!("no reply"),
    }
    Ok(())
}

async fn run(cli: Cli, worker: &Worker) -> Result<()> {
    match cli.command {
        Commands::Install => {
            worker.dispatch(Event::Install).await?;
            println!("installed {}", worker.generations().current());
        }
        Commands::Activate => {
            if let EventOutcome::Activated { deleted } = worker.dispatch(Event::Activate).await? {
                for name in &deleted {
                    println!("deleted {name}");
                }
                println!("activated {} ({} removed)", worker.generations().current(), deleted.len());
            }
        }
        Commands::Start => {
            let deleted = worker.start().await?;
            println!("active {} ({} removed)", worker.generations().current(), deleted.len());
        }
        Commands::Fetch { url, navigate, method, body } => {
            let mut request = Request::new(method, worker.resolve(&url)?);
            request.navigation = navigate;

            let served = worker.fetch(request).await?;
            println!(
                "{} {:?} {}",
                served.response.status,
                served.source,
                served.response.content_type().unwrap_or("-")
            );
            if body {
                println!("{}", served.response.text());
            }
        }
        Commands::Version => print_reply(worker.message(ControlMessage::GetVersion).await)?,
        Commands::Clear => print_reply(worker.message(ControlMessage::ClearCache).await)?,
        Commands::CacheUrls { urls } => print_reply(worker.message(ControlMessage::CacheUrls { urls: Some(urls) }).await)?,
        Commands::Generations => {
            let store = worker.generations().store();
            for name in store.keys().await? {
                let marker = if name == worker.generations().current() { "*" } else { " " };
                println!("{marker} {name}\t{}", store.entry_count(&name).await?);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = AppConfig::load().context("failed to load configuration")?;
    tracing::debug!(generation = %config.generation, db = %config.db_path.display(), "configuration loaded");
    let worker = build_worker(&config).await?;

    let result = run(cli, &worker).await;
    worker.settle().await;
    result
}
