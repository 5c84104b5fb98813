// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Spark shopping assistant.
//!
//! One database file holds two tables: product documents (keyed by
//! `product_id`, with a category index) and the append-only conversation
//! log. All access goes through `tokio-rusqlite`'s single background thread.

pub mod adapter;
pub mod database;
pub mod queries;
pub mod schema;

pub use adapter::SqliteStorage;
pub use database::Database;
pub use schema::TableNames;
