// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the catalog and conversation store traits.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::debug;

use spark_config::model::StorageConfig;
use spark_core::{
    AdapterType, CatalogStore, ConversationStore, ConversationTurn, HealthStatus, PluginAdapter,
    SparkError, UserId,
};

use crate::database::{Database, map_tr_err};
use crate::queries;
use crate::schema::TableNames;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is opened on the first call to
/// [`SqliteStorage::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`](Self::initialize) is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wraps an already-open database.
    pub fn from_database(config: StorageConfig, db: Database) -> Self {
        Self {
            config,
            db: OnceCell::new_with(Some(db)),
        }
    }

    /// Opens the database file and creates the configured tables.
    pub async fn initialize(&self) -> Result<(), SparkError> {
        let tables = TableNames::from_config(&self.config)?;
        let db = Database::open(&self.config.database_path, tables, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| SparkError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    /// Returns the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, SparkError> {
        self.db.get().ok_or_else(|| SparkError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    /// Bulk import used by the `seed` command. Returns the number of records written.
    pub async fn import_products(&self, documents: Vec<Value>) -> Result<usize, SparkError> {
        let ids = queries::products::upsert_products(self.db()?, documents).await?;
        Ok(ids.len())
    }

    pub async fn product_count(&self) -> Result<u64, SparkError> {
        queries::products::count_products(self.db()?).await
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, SparkError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SparkError> {
        if let Some(db) = self.db.get() {
            db.connection()
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(map_tr_err)?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for SqliteStorage {
    async fn get_product(&self, product_id: &str) -> Result<Option<Value>, SparkError> {
        queries::products::get_product(self.db()?, product_id).await
    }

    async fn scan_products(&self, category: Option<&str>) -> Result<Vec<Value>, SparkError> {
        queries::products::scan_products(self.db()?, category).await
    }

    async fn query_category(
        &self,
        category: &str,
        limit: usize,
    ) -> Result<Vec<Value>, SparkError> {
        queries::products::query_category(self.db()?, category, limit).await
    }

    async fn upsert_product(&self, product: Value) -> Result<String, SparkError> {
        let mut ids = queries::products::upsert_products(self.db()?, vec![product]).await?;
        ids.pop()
            .ok_or_else(|| SparkError::Internal("upsert returned no id".into()))
    }
}

#[async_trait]
impl ConversationStore for SqliteStorage {
    async fn append_turn(&self, turn: &ConversationTurn) -> Result<(), SparkError> {
        queries::turns::insert_turn(self.db()?, turn).await
    }

    async fn recent_turns(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, SparkError> {
        queries::turns::recent_turns(self.db()?, user_id, limit).await
    }
}
