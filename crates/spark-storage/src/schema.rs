// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Table definitions.
//!
//! Table names are configurable, so DDL is generated rather than embedded.
//! Names are checked to be plain SQL identifiers before they reach any
//! statement.

use spark_config::model::StorageConfig;
use spark_config::validation::is_sql_identifier;
use spark_core::SparkError;

/// Validated names of the two tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    products: String,
    chat_history: String,
}

impl TableNames {
    pub fn new(products: &str, chat_history: &str) -> Result<Self, SparkError> {
        for name in [products, chat_history] {
            if !is_sql_identifier(name) {
                return Err(SparkError::Config(format!(
                    "`{name}` is not a valid table name"
                )));
            }
        }
        Ok(Self {
            products: products.to_string(),
            chat_history: chat_history.to_string(),
        })
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self, SparkError> {
        Self::new(&config.products_table, &config.chat_history_table)
    }

    pub fn products(&self) -> &str {
        &self.products
    }

    pub fn chat_history(&self) -> &str {
        &self.chat_history
    }

    /// Idempotent DDL for both tables and their indexes.
    pub fn create_statements(&self) -> String {
        let p = &self.products;
        let c = &self.chat_history;
        format!(
            "CREATE TABLE IF NOT EXISTS {p} (
                product_id        TEXT PRIMARY KEY NOT NULL,
                category_key      TEXT,
                root_category_key TEXT,
                document          TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_{p}_category ON {p} (category_key);
            CREATE INDEX IF NOT EXISTS idx_{p}_root_category ON {p} (root_category_key);

            CREATE TABLE IF NOT EXISTS {c} (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id    TEXT NOT NULL,
                session_id TEXT,
                role       TEXT NOT NULL CHECK (role IN ('user', 'model')),
                content    TEXT NOT NULL,
                timestamp  TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_{c}_user_time ON {c} (user_id, timestamp, id);"
        )
    }
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            products: "products".to_string(),
            chat_history: "chat_history".to_string(),
        }
    }
}
