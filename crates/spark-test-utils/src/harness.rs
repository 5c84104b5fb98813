// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the complete turn pipeline: a temp SQLite
//! database holding both the catalog and the conversation log, the real
//! catalog tools in a registry, a scripted [`MockProvider`], and an
//! [`Orchestrator`] over all of them.

use std::sync::Arc;

use serde_json::Value;
use spark_agent::{ChatReply, ChatRequest, Orchestrator, OrchestratorSettings};
use spark_catalog::register_catalog_tools;
use spark_config::SparkConfig;
use spark_config::model::StorageConfig;
use spark_core::SparkError;
use spark_skill::ToolRegistry;
use spark_storage::SqliteStorage;

use crate::mock_provider::{MockProvider, MockReply};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    script: Vec<MockReply>,
    products: Vec<Value>,
    history_limit: Option<usize>,
    system_prompt: Option<String>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            script: Vec::new(),
            products: Vec::new(),
            history_limit: None,
            system_prompt: None,
        }
    }

    /// Set the mock provider's scripted replies.
    pub fn with_script(mut self, script: Vec<MockReply>) -> Self {
        self.script = script;
        self
    }

    /// Seed the catalog with these product documents.
    pub fn with_products(mut self, products: Vec<Value>) -> Self {
        self.products = products;
        self
    }

    /// Number of stored turns sent to the model.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    /// Set a custom system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, SparkError> {
        let temp_dir = tempfile::TempDir::new().map_err(SparkError::storage)?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = SparkConfig {
            storage: StorageConfig {
                database_path: db_path.to_string_lossy().into_owned(),
                ..StorageConfig::default()
            },
            ..SparkConfig::default()
        };
        config.agent.system_prompt = self.system_prompt;
        if let Some(limit) = self.history_limit {
            config.agent.history_limit = limit;
        }

        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        if !self.products.is_empty() {
            storage.import_products(self.products).await?;
        }
        let storage = Arc::new(storage);

        let mut registry = ToolRegistry::new();
        register_catalog_tools(&mut registry, storage.clone())?;

        let provider = Arc::new(MockProvider::with_script(self.script));
        let settings = OrchestratorSettings::from_config(&config).await;
        let orchestrator = Arc::new(Orchestrator::new(
            provider.clone(),
            storage.clone(),
            Arc::new(registry),
            settings,
        ));

        Ok(TestHarness {
            provider,
            storage,
            orchestrator,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with a mock provider and temp storage.
pub struct TestHarness {
    /// The scripted model provider.
    pub provider: Arc<MockProvider>,
    /// SQLite storage (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    pub orchestrator: Arc<Orchestrator>,
    /// Effective configuration, pointing at the temp database.
    pub config: SparkConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Run one turn through the orchestrator.
    pub async fn chat(&self, message: &str, user_id: &str) -> Result<ChatReply, SparkError> {
        self.orchestrator
            .handle_turn(ChatRequest::new(message, user_id))
            .await
    }

    /// Append a reply to the mock provider's script.
    pub async fn push_reply(&self, reply: MockReply) {
        self.provider.push(reply).await;
    }
}
