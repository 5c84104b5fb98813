// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and schema creation.
//!
//! All statements are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use spark_core::SparkError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::schema::TableNames;

/// Handle to the open database and the table names it was created with.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
    tables: TableNames,
}

impl Database {
    /// Opens (creating if needed) the database file and ensures the schema exists.
    pub async fn open(path: &str, tables: TableNames, wal_mode: bool) -> Result<Self, SparkError> {
        let conn = Connection::open(path).await.map_err(SparkError::storage)?;
        let db = Self { conn, tables };
        db.prepare(wal_mode).await?;
        debug!(path, "database opened");
        Ok(db)
    }

    /// Opens a private in-memory database. Used by tests and dry runs.
    pub async fn open_in_memory(tables: TableNames) -> Result<Self, SparkError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(SparkError::storage)?;
        let db = Self { conn, tables };
        db.prepare(false).await?;
        Ok(db)
    }

    async fn prepare(&self, wal_mode: bool) -> Result<(), SparkError> {
        let ddl = self.tables.create_statements();
        self.conn
            .call(move |conn| {
                if wal_mode {
                    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
                }
                conn.execute_batch(
                    "PRAGMA synchronous = NORMAL;
                     PRAGMA busy_timeout = 5000;
                     PRAGMA foreign_keys = ON;",
                )?;
                conn.execute_batch(&ddl)?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn tables(&self) -> &TableNames {
        &self.tables
    }
}

/// Maps a tokio-rusqlite error into the storage variant.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> SparkError {
    SparkError::Storage {
        source: Box::new(e),
    }
}
