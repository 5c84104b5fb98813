// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Google Gemini provider adapter for the Spark shopping assistant.
//!
//! This crate implements [`ProviderAdapter`] for the Generative Language
//! `generateContent` endpoint, including function declarations and
//! function-call/function-response round trips.

pub mod client;
pub mod schema;
pub mod types;

use async_trait::async_trait;
use spark_config::SparkConfig;
use spark_core::error::SparkError;
use spark_core::traits::{PluginAdapter, ProviderAdapter};
use spark_core::types::{
    AdapterType, ContentPart, FunctionCall, HealthStatus, ProviderMessage, ProviderRequest,
    ProviderResponse, Role, TokenUsage,
};
use tracing::{debug, info, warn};

use crate::client::GeminiClient;
use crate::schema::to_gemini_schema;
use crate::types::{
    ApiFunctionCall, ApiFunctionResponse, ApiTool, Content, FunctionDeclaration,
    GenerateContentRequest, GenerateContentResponse, Part,
};

/// Gemini provider implementing [`ProviderAdapter`].
///
/// API key resolution order: config -> `GEMINI_API_KEY` env var -> error.
pub struct GeminiProvider {
    client: GeminiClient,
}

impl GeminiProvider {
    /// Creates a new Gemini provider from the given configuration.
    pub fn new(config: &SparkConfig) -> Result<Self, SparkError> {
        let api_key = resolve_api_key(&config.gemini.api_key)?;
        let client = GeminiClient::new(api_key, &config.gemini)?;

        info!(model = config.gemini.model, "Gemini provider initialized");

        Ok(Self { client })
    }

    /// Creates a provider around an existing client.
    pub fn with_client(client: GeminiClient) -> Self {
        Self { client }
    }

    /// Converts a [`ProviderRequest`] into the API request body.
    fn to_api_request(&self, request: &ProviderRequest) -> GenerateContentRequest {
        let contents = request.messages.iter().map(to_api_content).collect();

        let system_instruction = request
            .system_instruction
            .as_ref()
            .filter(|s| !s.is_empty())
            .map(|s| Content {
                role: None,
                parts: vec![Part::text(s.clone())],
            });

        let tools = if request.tools.is_empty() {
            Vec::new()
        } else {
            vec![ApiTool {
                function_declarations: request
                    .tools
                    .iter()
                    .map(|t| FunctionDeclaration {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: to_gemini_schema(&t.parameters),
                    })
                    .collect(),
            }]
        };

        GenerateContentRequest {
            contents,
            system_instruction,
            tools,
        }
    }

    fn model_for<'a>(&'a self, request: &'a ProviderRequest) -> &'a str {
        if request.model.is_empty() {
            self.client.default_model()
        } else {
            &request.model
        }
    }
}

/// Converts one working-context message into API content.
///
/// A message carrying its provider-native form is replayed unchanged.
fn to_api_content(message: &ProviderMessage) -> Content {
    if let Some(raw) = &message.raw {
        match serde_json::from_value::<Content>(raw.clone()) {
            Ok(content) => return content,
            Err(e) => warn!(error = %e, "stored candidate content is not replayable, rebuilding"),
        }
    }

    let parts = message
        .parts
        .iter()
        .map(|part| match part {
            ContentPart::Text(text) => Part::text(text.clone()),
            ContentPart::FunctionCall(call) => Part {
                function_call: Some(ApiFunctionCall {
                    name: call.name.clone(),
                    args: call.args.clone(),
                }),
                ..Part::default()
            },
            ContentPart::FunctionResponse { name, response } => Part {
                function_response: Some(ApiFunctionResponse {
                    name: name.clone(),
                    response: response.clone(),
                }),
                ..Part::default()
            },
        })
        .collect();

    Content {
        role: Some(message.role.to_string()),
        parts,
    }
}

/// Maps the first candidate of an API response onto a [`ProviderResponse`].
fn from_api_response(response: GenerateContentResponse) -> ProviderResponse {
    let usage = response.usage_metadata.map(|u| TokenUsage {
        input_tokens: u.prompt_token_count,
        output_tokens: u.candidates_token_count,
    });

    let Some(candidate) = response.candidates.into_iter().next() else {
        warn!("response contained no candidates");
        return ProviderResponse {
            usage,
            ..ProviderResponse::default()
        };
    };

    let finish_reason = candidate.finish_reason;
    let Some(content) = candidate.content else {
        return ProviderResponse {
            usage,
            finish_reason,
            ..ProviderResponse::default()
        };
    };

    let mut text: Option<String> = None;
    let mut function_calls = Vec::new();
    let mut parts = Vec::new();

    for part in &content.parts {
        if let Some(t) = &part.text {
            text.get_or_insert_with(String::new).push_str(t);
            parts.push(ContentPart::Text(t.clone()));
        }
        if let Some(call) = &part.function_call {
            let call = FunctionCall {
                name: call.name.clone(),
                args: call.args.clone(),
            };
            function_calls.push(call.clone());
            parts.push(ContentPart::FunctionCall(call));
        }
    }

    let raw = serde_json::to_value(&content).ok();

    ProviderResponse {
        text,
        function_calls,
        candidate_content: Some(ProviderMessage {
            role: Role::Model,
            parts,
            raw,
        }),
        usage,
        finish_reason,
    }
}

#[async_trait]
impl PluginAdapter for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, SparkError> {
        // Reachability is only learned from real calls.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SparkError> {
        debug!("Gemini provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for GeminiProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, SparkError> {
        let api_request = self.to_api_request(&request);
        let model = self.model_for(&request);
        let response = self.client.generate_content(model, &api_request).await?;
        let mapped = from_api_response(response);

        debug!(
            model,
            function_calls = mapped.function_calls.len(),
            finish_reason = mapped.finish_reason.as_deref().unwrap_or(""),
            "completion received"
        );
        Ok(mapped)
    }
}

/// Resolves the API key from config or environment.
fn resolve_api_key(config_key: &Option<String>) -> Result<String, SparkError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.clone());
    }

    match std::env::var("GEMINI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(key),
        _ => Err(SparkError::Config(
            "Gemini API key not found. Set gemini.api_key in config or GEMINI_API_KEY environment variable.".into(),
        )),
    }
}
