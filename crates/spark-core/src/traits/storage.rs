// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage traits: the product catalog and the conversation log.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::SparkError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ConversationTurn, UserId};

/// Read access to the product catalog.
///
/// Product records are schemaless JSON documents keyed by `product_id`.
/// Numeric fields may be stored as text; callers coerce before comparing.
#[async_trait]
pub trait CatalogStore: PluginAdapter {
    /// Key-value lookup by product id.
    async fn get_product(&self, product_id: &str) -> Result<Option<Value>, SparkError>;

    /// Full scan, optionally filtered to products whose `category_name` or
    /// `root_category_name` equals `category` (case-insensitive).
    async fn scan_products(&self, category: Option<&str>) -> Result<Vec<Value>, SparkError>;

    /// Exact lookup on the category index, capped at `limit` items.
    async fn query_category(&self, category: &str, limit: usize)
    -> Result<Vec<Value>, SparkError>;

    /// Inserts or replaces a product record. Returns its id.
    async fn upsert_product(&self, product: Value) -> Result<String, SparkError>;
}

/// Append-only per-user message log.
#[async_trait]
pub trait ConversationStore: PluginAdapter {
    /// Appends one turn.
    async fn append_turn(&self, turn: &ConversationTurn) -> Result<(), SparkError>;

    /// Returns the most recent `limit` turns for `user_id`, oldest first.
    async fn recent_turns(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, SparkError>;
}
