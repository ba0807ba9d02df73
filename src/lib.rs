//! # cloudswarm
//!
//! Multi-provider rate-limited LLM task dispatch engine.
//!
//! Takes a stream of generic completion tasks and executes them against a
//! pool of remote inference providers, each with its own wire protocol,
//! request quota, and latency profile. The engine picks the best currently
//! eligible provider, falls back through the pool on failure or exhaustion,
//! and degrades to a local backend when all remote capacity is spent.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cloudswarm::config::Config;
//! use cloudswarm::core::{Dispatcher, StaticTaskSource, StubLocalBackend};
//! use cloudswarm::storage::{JsonSummaryStore, JsonlResultSink};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("swarm.yaml").await?;
//!     let router = Arc::new(cloudswarm::build_pool(&config.providers)?);
//!
//!     let dispatcher = Dispatcher::new(
//!         router,
//!         Arc::new(StubLocalBackend),
//!         Arc::new(StaticTaskSource::new("probe", "You are concise.", "Say hello.")),
//!         Arc::new(JsonlResultSink::new(&config.dispatch.results_path)),
//!         Arc::new(JsonSummaryStore::new(
//!             &config.dispatch.summary_path,
//!             &config.dispatch.cumulative_path,
//!         )),
//!         config.dispatch.clone(),
//!     );
//!
//!     let stats = dispatcher.run_sprint(10, "manual", false).await?;
//!     println!("{} succeeded, {} failed", stats.succeeded, stats.failed);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod storage;
pub mod utils;

pub use config::{Config, DispatchConfig, ProviderDescriptor, WireFamily};
pub use core::{
    Dispatcher, ExecOutcome, LocalCompletion, ProviderClient, RunStats, SmartRouter, StopHandle,
    Task, TaskResult, TaskSource, TaskStatus,
};
pub use utils::error::{Result, SwarmError};

use std::sync::Arc;

/// Build the provider pool from descriptors, resolving credentials from the
/// environment. Providers with missing credentials stay in the pool but are
/// never selected.
pub fn build_pool(descriptors: &[ProviderDescriptor]) -> Result<SmartRouter> {
    let clients = descriptors
        .iter()
        .map(|desc| ProviderClient::new(desc.clone()).map(Arc::new))
        .collect::<Result<Vec<_>>>()?;
    Ok(SmartRouter::new(clients))
}

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
