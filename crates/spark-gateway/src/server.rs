// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the assistant service.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use spark_agent::Orchestrator;
use spark_config::model::ServerConfig;
use spark_core::{CatalogStore, SparkError};
use tokio_util::sync::CancellationToken;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Catalog read by the storefront feed.
    pub catalog: Arc<dyn CatalogStore>,
    /// `limit` used by the history endpoint when none is given.
    pub history_default_limit: usize,
    /// Upper bound applied to the history endpoint's `limit`.
    pub history_max_limit: usize,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        catalog: Arc<dyn CatalogStore>,
        config: &ServerConfig,
    ) -> Self {
        Self {
            orchestrator,
            catalog,
            history_default_limit: config.history_default_limit,
            history_max_limit: config.history_max_limit,
        }
    }
}

/// Builds the CORS layer from the configured origins.
///
/// `*` allows any origin without credentials. Otherwise only the listed
/// origins are allowed, with credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Builds the application router.
///
/// Routes:
/// - POST /chat
/// - GET /chat/history/{user_id}
/// - GET /products
/// - GET /health
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let mut app = Router::new()
        .route("/health", get(handlers::get_health))
        .route("/chat", post(handlers::post_chat))
        .route("/chat/history/{user_id}", get(handlers::get_history))
        .route("/products", get(handlers::get_products))
        .with_state(state);

    if let Some(max) = config.max_concurrent_requests {
        app = app.layer(ConcurrencyLimitLayer::new(max));
    }

    app.layer(cors_layer(&config.allowed_origins))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(TraceLayer::new_for_http())
}

/// Socket address for `host` and `port`. IP literals of either family are
/// used as-is; names go through the resolver.
async fn bind_addr(host: &str, port: u16) -> Result<SocketAddr, SparkError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }
    tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| SparkError::Internal(format!("cannot resolve host {host}: {e}")))?
        .next()
        .ok_or_else(|| SparkError::Internal(format!("host {host} resolved to no address")))
}

/// Binds to the configured host:port and serves until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: AppState,
    cancel: CancellationToken,
) -> Result<(), SparkError> {
    let app = build_router(state, config);

    let addr = bind_addr(&config.host, config.port).await?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| SparkError::Internal(format!("failed to bind {addr}: {e}")))?;

    info!("Spark server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| SparkError::Internal(format!("server error: {e}")))?;

    info!("Spark server stopped");
    Ok(())
}
