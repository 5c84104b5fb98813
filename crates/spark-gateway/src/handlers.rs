// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers.
//!
//! Handles POST /chat, GET /chat/history/{user_id}, GET /products, GET /health.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use spark_agent::ChatRequest;
use spark_core::error::{CODE_INTERNAL_SERVER_ERROR, CODE_MISSING_REQUIRED_FIELDS};
use spark_core::{ConversationTurn, SparkError};
use tracing::{debug, error};

use crate::server::AppState;
use crate::storefront::StorefrontProduct;

/// Default page size of the storefront feed.
const PRODUCTS_DEFAULT_LIMIT: usize = 24;
const PRODUCTS_MAX_LIMIT: usize = 200;

/// Response body for POST /chat.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub reply: String,
    /// Product list from the dispatched tool, for rendering as cards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    pub session_id: String,
    pub timestamp: String,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub version: &'static str,
}

/// Response body for GET /chat/history/{user_id}.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<ConversationTurn>,
    pub count: usize,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

/// `?limit=` is read leniently: anything unparsable falls back to the default.
#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    #[serde(default)]
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductsQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub limit: Option<String>,
}

fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_limit(raw: Option<&str>, default: usize, max: usize) -> usize {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
        .min(max)
}

fn error_response(status: StatusCode, message: impl Into<String>, code: &'static str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            code,
        }),
    )
        .into_response()
}

/// Maps an error to a status and body. Server-side details stay in the log.
fn spark_error_response(err: &SparkError) -> Response {
    match err {
        SparkError::MissingField { .. } => error_response(
            StatusCode::BAD_REQUEST,
            "Both message and userId are required.",
            err.error_code(),
        ),
        SparkError::InvalidIdentifier { .. } => error_response(
            StatusCode::BAD_REQUEST,
            "userId must be a phone number or an email address.",
            err.error_code(),
        ),
        _ => {
            error!(error = %err, "request failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong while processing your request.",
                CODE_INTERNAL_SERVER_ERROR,
            )
        }
    }
}

fn string_field(body: &Value, key: &str) -> Option<String> {
    body.get(key).and_then(Value::as_str).map(str::to_string)
}

/// POST /chat
///
/// Runs one turn. A body that is not JSON, or whose fields are not strings,
/// is treated as missing those fields.
pub async fn post_chat(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            debug!(error = %rejection, "rejected chat body");
            return error_response(
                StatusCode::BAD_REQUEST,
                "Both message and userId are required.",
                CODE_MISSING_REQUIRED_FIELDS,
            );
        }
    };

    let request = ChatRequest {
        message: string_field(&body, "message"),
        user_id: string_field(&body, "userId"),
        session_id: string_field(&body, "sessionId"),
    };

    match state.orchestrator.handle_turn(request).await {
        Ok(reply) => Json(ChatResponse {
            reply: reply.reply,
            data: reply.data,
            tool: reply.tool,
            session_id: reply.session_id,
            timestamp: rfc3339(reply.timestamp),
        })
        .into_response(),
        Err(e) => spark_error_response(&e),
    }
}

/// GET /health
pub async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: rfc3339(Utc::now()),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /chat/history/{user_id}?limit=N
pub async fn get_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Response {
    let limit = parse_limit(
        query.limit.as_deref(),
        state.history_default_limit,
        state.history_max_limit,
    );

    match state.orchestrator.history(&user_id, limit).await {
        Ok(history) => Json(HistoryResponse {
            count: history.len(),
            history,
        })
        .into_response(),
        Err(e) => spark_error_response(&e),
    }
}

/// GET /products?category=&limit=
pub async fn get_products(
    State(state): State<AppState>,
    Query(query): Query<ProductsQuery>,
) -> Response {
    let limit = parse_limit(
        query.limit.as_deref(),
        PRODUCTS_DEFAULT_LIMIT,
        PRODUCTS_MAX_LIMIT,
    );
    let category = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    match state.catalog.scan_products(category).await {
        Ok(products) => {
            let cards: Vec<StorefrontProduct> = products
                .iter()
                .take(limit)
                .map(StorefrontProduct::from_document)
                .collect();
            Json(cards).into_response()
        }
        Err(e) => spark_error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_limit_defaults_and_clamps() {
        assert_eq!(parse_limit(None, 50, 200), 50);
        assert_eq!(parse_limit(Some("10"), 50, 200), 10);
        assert_eq!(parse_limit(Some("1000"), 50, 200), 200);
        assert_eq!(parse_limit(Some("0"), 50, 200), 50);
        assert_eq!(parse_limit(Some("ten"), 50, 200), 50);
        assert_eq!(parse_limit(Some("-3"), 50, 200), 50);
    }

    #[test]
    fn string_field_ignores_non_strings() {
        let body = serde_json::json!({"message": 42, "userId": "a@b.co"});
        assert_eq!(string_field(&body, "message"), None);
        assert_eq!(string_field(&body, "userId").as_deref(), Some("a@b.co"));
    }
}
