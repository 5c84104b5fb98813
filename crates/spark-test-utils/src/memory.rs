// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory catalog and conversation stores.
//!
//! Both follow the SQLite store's semantics (category matching, id
//! ordering, newest-N history in chronological order) and can be switched
//! into a failing mode to exercise degraded paths.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use spark_core::traits::{CatalogStore, ConversationStore, PluginAdapter};
use spark_core::types::{AdapterType, ConversationTurn, HealthStatus, UserId, normalize_category};
use spark_core::SparkError;
use spark_storage::queries::products::product_key;

fn injected(what: &str) -> SparkError {
    SparkError::storage(std::io::Error::other(format!("injected {what} failure")))
}

fn category_of(doc: &Value, field: &str) -> Option<String> {
    doc.get(field).and_then(Value::as_str).map(normalize_category)
}

/// Product catalog held in a `BTreeMap`, so scans come back in id order.
#[derive(Default)]
pub struct MemoryCatalog {
    products: Mutex<BTreeMap<String, Value>>,
    fail_reads: AtomicBool,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from documents; those without a usable `product_id` are skipped.
    pub fn with_products(products: Vec<Value>) -> Self {
        let map = products
            .into_iter()
            .filter_map(|doc| product_key(&doc).map(|id| (id, doc)))
            .collect();
        Self {
            products: Mutex::new(map),
            fail_reads: AtomicBool::new(false),
        }
    }

    /// Makes every read return a storage error while `fail` is set.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check_reads(&self) -> Result<(), SparkError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            Err(injected("read"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PluginAdapter for MemoryCatalog {
    fn name(&self) -> &str {
        "memory-catalog"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, SparkError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SparkError> {
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn get_product(&self, product_id: &str) -> Result<Option<Value>, SparkError> {
        self.check_reads()?;
        Ok(self.products.lock().await.get(product_id.trim()).cloned())
    }

    async fn scan_products(&self, category: Option<&str>) -> Result<Vec<Value>, SparkError> {
        self.check_reads()?;
        let key = category.map(normalize_category);
        let products = self.products.lock().await;
        Ok(products
            .values()
            .filter(|doc| match &key {
                Some(key) => {
                    category_of(doc, "category_name").as_ref() == Some(key)
                        || category_of(doc, "root_category_name").as_ref() == Some(key)
                }
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn query_category(&self, category: &str, limit: usize) -> Result<Vec<Value>, SparkError> {
        self.check_reads()?;
        let key = normalize_category(category);
        let products = self.products.lock().await;
        Ok(products
            .values()
            .filter(|doc| category_of(doc, "category_name").as_deref() == Some(key.as_str()))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn upsert_product(&self, product: Value) -> Result<String, SparkError> {
        let id = product_key(&product)
            .ok_or_else(|| SparkError::Internal("product has no usable `product_id`".into()))?;
        self.products.lock().await.insert(id.clone(), product);
        Ok(id)
    }
}

/// Conversation log kept in insertion order.
#[derive(Default)]
pub struct MemoryConversations {
    turns: Mutex<Vec<ConversationTurn>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryConversations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored turn, for every user, in insertion order.
    pub async fn turns(&self) -> Vec<ConversationTurn> {
        self.turns.lock().await.clone()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PluginAdapter for MemoryConversations {
    fn name(&self) -> &str {
        "memory-conversations"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, SparkError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SparkError> {
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for MemoryConversations {
    async fn append_turn(&self, turn: &ConversationTurn) -> Result<(), SparkError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected("write"));
        }
        self.turns.lock().await.push(turn.clone());
        Ok(())
    }

    async fn recent_turns(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, SparkError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(injected("read"));
        }
        let turns = self.turns.lock().await;
        let mut mine: Vec<(usize, &ConversationTurn)> = turns
            .iter()
            .enumerate()
            .filter(|(_, t)| t.user_id == user_id.as_str())
            .collect();
        // Timestamp order, insertion order on ties.
        mine.sort_by(|(ia, a), (ib, b)| a.timestamp.cmp(&b.timestamp).then(ia.cmp(ib)));
        let skip = mine.len().saturating_sub(limit);
        Ok(mine.into_iter().skip(skip).map(|(_, t)| t.clone()).collect())
    }
}
