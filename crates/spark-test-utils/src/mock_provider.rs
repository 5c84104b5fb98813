// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock model provider for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with a scripted FIFO of
//! replies and keeps a copy of every request it receives, so tests can
//! assert on exactly what the orchestrator sent.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use spark_core::SparkError;
use spark_core::traits::{PluginAdapter, ProviderAdapter};
use spark_core::types::{
    AdapterType, FunctionCall, HealthStatus, ProviderMessage, ProviderRequest, ProviderResponse,
    Role, TokenUsage,
};

/// One scripted model outcome.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Plain text answer.
    Text(String),
    /// One or more function calls, in order.
    Calls(Vec<FunctionCall>),
    /// The call fails with a provider error carrying this message.
    Fail(String),
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Text(text.into())
    }

    pub fn call(name: impl Into<String>, args: Value) -> Self {
        MockReply::Calls(vec![FunctionCall {
            name: name.into(),
            args,
        }])
    }

    pub fn calls(calls: Vec<FunctionCall>) -> Self {
        MockReply::Calls(calls)
    }

    pub fn fail(message: impl Into<String>) -> Self {
        MockReply::Fail(message.into())
    }
}

/// A mock provider that returns scripted replies.
///
/// Replies are popped from a FIFO queue. When the queue is empty,
/// a default "mock response" text is returned.
pub struct MockProvider {
    script: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<ProviderRequest>>>,
}

impl MockProvider {
    /// Create a new mock provider with an empty script.
    pub fn new() -> Self {
        Self::with_script(Vec::new())
    }

    /// Create a mock provider pre-loaded with the given replies.
    pub fn with_script(script: Vec<MockReply>) -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::from(script))),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a reply to the end of the script.
    pub async fn push(&self, reply: MockReply) {
        self.script.lock().await.push_back(reply);
    }

    /// Every request received so far, in order.
    pub async fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    async fn next_reply(&self) -> MockReply {
        self.script
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| MockReply::text("mock response"))
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, SparkError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SparkError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, SparkError> {
        self.requests.lock().await.push(request);
        let usage = Some(TokenUsage {
            input_tokens: 10,
            output_tokens: 20,
        });

        match self.next_reply().await {
            MockReply::Text(text) => Ok(ProviderResponse {
                candidate_content: Some(ProviderMessage::text(Role::Model, text.clone())),
                text: Some(text),
                usage,
                finish_reason: Some("STOP".to_string()),
                ..ProviderResponse::default()
            }),
            MockReply::Calls(calls) => {
                let parts = calls
                    .iter()
                    .cloned()
                    .map(spark_core::ContentPart::FunctionCall)
                    .collect();
                Ok(ProviderResponse {
                    text: None,
                    candidate_content: Some(ProviderMessage {
                        role: Role::Model,
                        parts,
                        raw: None,
                    }),
                    function_calls: calls,
                    usage,
                    finish_reason: Some("STOP".to_string()),
                })
            }
            MockReply::Fail(message) => Err(SparkError::Provider {
                message,
                source: None,
            }),
        }
    }
}
