//! Authorization adapter entry point.
//!
//! # Architecture Overview
//!
//! ```text
//!               ┌────────────────────────────────────────────────────────┐
//!               │                 AUTHORIZATION ADAPTER                  │
//!               │                                                        │
//!   environment │  ┌──────────┐   ┌────────────────────────────────┐     │
//!   ────────────┼─▶│ settings │──▶│ resolvers                      │     │
//!               │  └──────────┘   │  client / cache / backend /    │     │
//!               │                 │  metrics / lifecycle           │     │
//!               │                 └──────────────┬─────────────────┘     │
//!               │                                ▼                       │
//!               │                        ┌──────────────┐               │
//!               │                        │  authorizer  │               │
//!               │                        │   manager    │               │
//!               │                        └──────┬───────┘               │
//!               │                               ▼                       │
//!   OS signals  │  ┌───────────┐       ┌────────────────┐               │
//!   ────────────┼─▶│ lifecycle │◀──────│ adapter server │               │
//!               │  │ supervise │ exit  │  (background)  │               │
//!               │  └───────────┘       └────────────────┘               │
//!               └────────────────────────────────────────────────────────┘
//! ```
//!
//! Startup is fail-fast: every resolver returns `Result`, and this binary is
//! the single place a fatal condition is logged and turned into a non-zero
//! exit.

use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::mpsc;

use authz_adapter::authorizer::backend::BackendConfig;
use authz_adapter::authorizer::cache::{SystemCache, SystemCacheConfig};
use authz_adapter::authorizer::Manager;
use authz_adapter::client::ClientConfig;
use authz_adapter::error::FatalError;
use authz_adapter::lifecycle::{self, signals};
use authz_adapter::logging;
use authz_adapter::metrics::MetricsReporter;
use authz_adapter::server::{AdapterConfig, AdapterServer};
use authz_adapter::settings::Settings;

#[tokio::main]
async fn main() -> ExitCode {
    let settings = Settings::from_env();
    logging::configure_logging(&settings);

    match run(&settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "fatal");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: &Settings) -> Result<(), FatalError> {
    let client = ClientConfig::resolve(settings)?.build()?;
    let cache = SystemCache::new(SystemCacheConfig::resolve(settings));
    let backend = BackendConfig::resolve(settings);
    let metrics = MetricsReporter::resolve(settings).await?;

    let authorizer = Arc::new(Manager::new(client, cache, backend, metrics));

    let addr = lifecycle::resolve_listen_addr(settings);
    let server = AdapterServer::bind(
        &addr,
        AdapterConfig {
            authorizer: authorizer.clone(),
            keep_alive_max_age: lifecycle::resolve_keep_alive_max_age(settings),
        },
    )
    .await?;

    let (exit_tx, exit_rx) = mpsc::channel(1);
    let handle = server.run(exit_tx);

    let signals = signals::spawn_signal_listener();
    lifecycle::supervise(&authorizer, &handle, signals, exit_rx).await
}
