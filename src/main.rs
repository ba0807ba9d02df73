//! Operator binary for the cloudswarm dispatch engine

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use cloudswarm::config::Config;
use cloudswarm::core::{
    Dispatcher, StaticTaskSource, StubLocalBackend, run_health_check,
};
use cloudswarm::storage::{JsonSummaryStore, JsonlResultSink};
use cloudswarm::utils::logging::init_tracing;

#[derive(Parser)]
#[command(name = "cloudswarm", version, about = "Multi-provider LLM task dispatcher")]
struct Cli {
    /// Path to the provider pool configuration
    #[arg(long, default_value = "swarm.yaml", env = "CLOUDSWARM_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one bounded sprint of tasks to completion
    Sprint {
        /// Number of tasks to execute
        #[arg(long, default_value_t = 10)]
        count: usize,
        /// Raise the batch ceiling for maximum throughput
        #[arg(long)]
        max_power: bool,
    },
    /// Repeat sprints on a fixed interval until interrupted
    Daemon {
        /// Tasks per sprint
        #[arg(long, default_value_t = 10)]
        count: usize,
        /// Seconds between sprints
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Exercise every configured provider once and report reachability
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_file(&cli.config)
        .await
        .context("failed to load configuration")?;

    let router = Arc::new(cloudswarm::build_pool(&config.providers)?);

    if matches!(cli.command, Command::Health) {
        let reports = run_health_check(&router).await;
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    let dispatcher = Dispatcher::new(
        Arc::clone(&router),
        Arc::new(StubLocalBackend),
        Arc::new(StaticTaskSource::new(
            "smoke",
            "You are a concise assistant.",
            "Produce a short status line confirming the dispatch pipeline works.",
        )),
        Arc::new(JsonlResultSink::new(&config.dispatch.results_path)),
        Arc::new(JsonSummaryStore::new(
            &config.dispatch.summary_path,
            &config.dispatch.cumulative_path,
        )),
        config.dispatch.clone(),
    );

    // Ctrl-C stops between batches; the in-flight batch drains
    let stop = dispatcher.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received; stopping after the current batch");
            stop.stop();
        }
    });

    match cli.command {
        Command::Sprint { count, max_power } => {
            let stats = dispatcher.run_sprint(count, "manual", max_power).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Daemon { count, interval } => {
            let secs = interval.unwrap_or(config.dispatch.daemon_interval_secs);
            dispatcher
                .run_daemon(count, Duration::from_secs(secs))
                .await?;
        }
        Command::Health => unreachable!("handled above"),
    }

    Ok(())
}
