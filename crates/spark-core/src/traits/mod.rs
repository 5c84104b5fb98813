// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seams between the orchestrator and its collaborators. Each trait is used
//! as `Arc<dyn _>`, hence `#[async_trait]`.

pub mod adapter;
pub mod provider;
pub mod storage;

pub use adapter::PluginAdapter;
pub use provider::ProviderAdapter;
pub use storage::{CatalogStore, ConversationStore};
