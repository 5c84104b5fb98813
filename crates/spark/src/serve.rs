// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `spark serve` wires storage, tools, the model provider and the HTTP
//! gateway together and runs until SIGTERM/SIGINT.

use std::sync::Arc;

use spark_agent::{Orchestrator, OrchestratorSettings, shutdown};
use spark_catalog::register_catalog_tools;
use spark_config::SparkConfig;
use spark_core::{HealthStatus, PluginAdapter, SparkError};
use spark_gateway::{AppState, start_server};
use spark_gemini::GeminiProvider;
use spark_skill::ToolRegistry;
use spark_storage::SqliteStorage;
use tracing::{info, warn};

/// Runs the `spark serve` command.
pub async fn run_serve(config: SparkConfig) -> Result<(), SparkError> {
    info!(name = %config.agent.name, "starting Spark");

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;

    let products = storage.product_count().await?;
    if products == 0 {
        warn!("product catalog is empty; import data with `spark seed <FILE>`");
    } else {
        info!(products, "product catalog ready");
    }

    let mut registry = ToolRegistry::new();
    register_catalog_tools(&mut registry, storage.clone())?;
    info!(tools = registry.len(), "tool registry initialized");

    let provider = Arc::new(GeminiProvider::new(&config)?);
    let adapters: [Arc<dyn PluginAdapter>; 2] = [storage.clone(), provider.clone()];
    for adapter in adapters {
        match adapter.health_check().await {
            Ok(HealthStatus::Healthy) => {
                info!(adapter = adapter.name(), version = %adapter.version(), "adapter ready");
            }
            Ok(status) => {
                warn!(adapter = adapter.name(), ?status, "adapter reports degraded health");
            }
            Err(e) => return Err(e),
        }
    }

    let settings = OrchestratorSettings::from_config(&config).await;
    info!(model = %settings.model, history_limit = settings.history_limit, "orchestrator configured");

    let orchestrator = Arc::new(Orchestrator::new(
        provider.clone(),
        storage.clone(),
        Arc::new(registry),
        settings,
    ));

    let cancel = shutdown::install_signal_handler();
    let state = AppState::new(orchestrator, storage.clone(), &config.server);

    let served = start_server(&config.server, state, cancel).await;

    if let Err(e) = provider.shutdown().await {
        warn!(error = %e, "provider shutdown failed");
    }
    if let Err(e) = storage.shutdown().await {
        warn!(error = %e, "storage shutdown failed");
    }

    served?;
    info!("Spark shutdown complete");
    Ok(())
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured level applies to the
/// Spark crates and HTTP tracing, and everything else logs at `warn`.
pub(crate) fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            [
                "spark",
                "spark_agent",
                "spark_catalog",
                "spark_gateway",
                "spark_gemini",
                "spark_skill",
                "spark_storage",
                "tower_http",
            ]
            .iter()
            .map(|target| format!("{target}={log_level}"))
            .chain(std::iter::once("warn".to_string()))
            .collect::<Vec<_>>()
            .join(","),
        )
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
