// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-request turn state machine.
//!
//! Each turn goes through states:
//! Start -> HistoryLoaded -> FirstModelCallDone -> (ToolDispatch ->)
//! SecondModelCallDone -> Persisted -> Done. Validation and first-call
//! failures end in Failed.
//!
//! The orchestrator holds no per-request state; one instance is shared by
//! every request through an `Arc`.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};
use spark_config::SparkConfig;
use spark_core::error::SparkError;
use spark_core::traits::{ConversationStore, ProviderAdapter};
use spark_core::types::{
    ContentPart, ConversationTurn, FunctionCall, ProviderMessage, ProviderRequest,
    ProviderResponse, Role, ToolDeclaration, UserId,
};
use spark_skill::{ToolRegistry, ToolResult};
use tracing::{debug, error, warn};

use crate::prompt::{default_system_instruction, resolve_system_prompt};

/// Sent when the model produced no text at all.
pub const FALLBACK_REPLY: &str =
    "I'm sorry, I didn't quite catch that. Could you please rephrase your question?";

/// Sent when the tool ran but the follow-up model call failed.
pub const SECOND_PASS_FAILURE_REPLY: &str = "I found some information for you, but I'm having \
trouble putting it into words right now. Please try again in a moment.";

/// States in the turn FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Request accepted, nothing done yet.
    Start,
    /// Prior turns loaded (or skipped after a store failure).
    HistoryLoaded,
    /// The model answered the first call.
    FirstModelCallDone,
    /// A requested tool is being validated and executed.
    ToolDispatch,
    /// The model answered with the tool result in context.
    SecondModelCallDone,
    /// Both turns were handed to the conversation store.
    Persisted,
    Done,
    Failed,
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnState::Start => write!(f, "start"),
            TurnState::HistoryLoaded => write!(f, "history_loaded"),
            TurnState::FirstModelCallDone => write!(f, "first_model_call_done"),
            TurnState::ToolDispatch => write!(f, "tool_dispatch"),
            TurnState::SecondModelCallDone => write!(f, "second_model_call_done"),
            TurnState::Persisted => write!(f, "persisted"),
            TurnState::Done => write!(f, "done"),
            TurnState::Failed => write!(f, "failed"),
        }
    }
}

/// An inbound chat message as received at the boundary.
///
/// Fields are optional so that absence is reported as a typed
/// [`SparkError::MissingField`] rather than a decoding failure.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            user_id: Some(user_id.into()),
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// The outcome of one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    /// Never empty.
    pub reply: String,
    /// The tool's list payload, when a tool ran and returned one.
    pub data: Option<Value>,
    /// Name of the dispatched tool, if any.
    pub tool: Option<String>,
    pub session_id: String,
    /// Timestamp of the persisted model turn.
    pub timestamp: DateTime<Utc>,
}

/// Fixed inputs to every model call.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub model: String,
    pub system_instruction: String,
    /// Number of stored turns sent to the model ahead of the new message.
    pub history_limit: usize,
}

impl OrchestratorSettings {
    /// Builds settings from the loaded configuration, reading the prompt file if one is set.
    pub async fn from_config(config: &SparkConfig) -> Self {
        Self {
            model: config.gemini.model.clone(),
            system_instruction: resolve_system_prompt(&config.agent).await,
            history_limit: config.agent.history_limit,
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            system_instruction: default_system_instruction(),
            history_limit: 20,
        }
    }
}

/// Runs chat turns against a model provider, a tool registry, and a conversation store.
pub struct Orchestrator {
    provider: Arc<dyn ProviderAdapter>,
    conversations: Arc<dyn ConversationStore>,
    registry: Arc<ToolRegistry>,
    tools: Vec<ToolDeclaration>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn ProviderAdapter>,
        conversations: Arc<dyn ConversationStore>,
        registry: Arc<ToolRegistry>,
        settings: OrchestratorSettings,
    ) -> Self {
        let tools = registry.declarations();
        Self {
            provider,
            conversations,
            registry,
            tools,
            settings,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Runs one user turn to completion.
    ///
    /// Only client input errors and a failed first model call are returned
    /// as errors. History, tool, second-call and persistence failures are
    /// logged and absorbed into the reply.
    pub async fn handle_turn(&self, request: ChatRequest) -> Result<ChatReply, SparkError> {
        let received_at = Utc::now();
        let (message, user_id) = match validate(&request) {
            Ok(valid) => valid,
            Err(e) => {
                debug!(state = %TurnState::Failed, error = %e, "turn rejected");
                return Err(e);
            }
        };
        let session_id = request
            .session_id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| format!("session_{}", received_at.timestamp_millis()));
        self.enter(&user_id, TurnState::Start);

        // History is best-effort: a broken store still gets an answer.
        let history = match self
            .conversations
            .recent_turns(&user_id, self.settings.history_limit)
            .await
        {
            Ok(turns) => turns,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "failed to load conversation history, continuing without it");
                Vec::new()
            }
        };
        // A user turn never sorts before the newest stored turn, even within one millisecond.
        let user_at = history.last().map_or(received_at, |newest| {
            received_at.max(newest.timestamp + Duration::milliseconds(1))
        });
        let mut context: Vec<ProviderMessage> = history.iter().map(ProviderMessage::from).collect();
        context.push(ProviderMessage::text(Role::User, message.clone()));
        self.enter(&user_id, TurnState::HistoryLoaded);

        let first = match self.provider.complete(self.model_request(context.clone())).await {
            Ok(response) => response,
            Err(e) => {
                error!(user_id = %user_id, error = %e, "model call failed");
                self.enter(&user_id, TurnState::Failed);
                return Err(e);
            }
        };
        self.enter(&user_id, TurnState::FirstModelCallDone);

        let mut data = None;
        let mut tool = None;
        let reply = match first.function_calls.first() {
            Some(call) => {
                if first.function_calls.len() > 1 {
                    warn!(
                        user_id = %user_id,
                        requested = first.function_calls.len(),
                        dispatched = %call.name,
                        "model requested several tool calls, dispatching only the first"
                    );
                }
                self.enter(&user_id, TurnState::ToolDispatch);

                context.push(recorded_call(&first, call));

                let result = match self.registry.dispatch(&call.name, call.args.clone()).await {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(user_id = %user_id, tool = %call.name, error = %e, "tool call rejected");
                        ToolResult::failure(e.to_string())
                    }
                };
                data = result.as_list().map(|items| Value::Array(items.clone()));
                tool = Some(call.name.clone());

                context.push(ProviderMessage::function_response(
                    call.name.clone(),
                    json!({ "result": result.to_value() }),
                ));

                let reply = match self.provider.complete(self.model_request(context)).await {
                    Ok(second) => second.text.unwrap_or_default(),
                    Err(e) => {
                        warn!(user_id = %user_id, error = %e, "second model call failed, sending fallback reply");
                        SECOND_PASS_FAILURE_REPLY.to_string()
                    }
                };
                self.enter(&user_id, TurnState::SecondModelCallDone);
                reply
            }
            None => first.text.unwrap_or_default(),
        };

        let reply = if reply.trim().is_empty() {
            FALLBACK_REPLY.to_string()
        } else {
            reply
        };

        let user_turn = ConversationTurn::new(&user_id, Role::User, message, user_at)
            .with_session(Some(session_id.clone()));
        // Strictly after the user turn so per-user order never ties.
        let replied_at = Utc::now().max(user_turn.timestamp + Duration::milliseconds(1));
        let model_turn = ConversationTurn::new(&user_id, Role::Model, reply.clone(), replied_at)
            .with_session(Some(session_id.clone()));

        for turn in [&user_turn, &model_turn] {
            if let Err(e) = self.conversations.append_turn(turn).await {
                warn!(user_id = %user_id, role = %turn.role, error = %e, "failed to persist conversation turn");
            }
        }
        self.enter(&user_id, TurnState::Persisted);
        self.enter(&user_id, TurnState::Done);

        Ok(ChatReply {
            reply,
            data,
            tool,
            session_id,
            timestamp: model_turn.timestamp,
        })
    }

    /// Returns up to `limit` stored turns for `user_id`, oldest first.
    pub async fn history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, SparkError> {
        let user_id = UserId::parse(user_id.trim())?;
        self.conversations.recent_turns(&user_id, limit).await
    }

    fn model_request(&self, messages: Vec<ProviderMessage>) -> ProviderRequest {
        ProviderRequest {
            model: self.settings.model.clone(),
            system_instruction: Some(self.settings.system_instruction.clone()),
            messages,
            tools: self.tools.clone(),
        }
    }

    fn enter(&self, user_id: &UserId, state: TurnState) {
        debug!(user_id = %user_id, state = %state, "turn state");
    }
}

/// The model message to place before the single function response.
///
/// Every function call in a model turn must be answered, so when several
/// were requested only the dispatched one is kept and the provider-native
/// form, which still carries the others, is dropped.
fn recorded_call(response: &ProviderResponse, dispatched: &FunctionCall) -> ProviderMessage {
    match &response.candidate_content {
        Some(candidate) if response.function_calls.len() <= 1 => candidate.clone(),
        Some(candidate) => {
            let mut kept_call = false;
            let parts = candidate
                .parts
                .iter()
                .filter(|part| match part {
                    ContentPart::FunctionCall(_) if kept_call => false,
                    ContentPart::FunctionCall(_) => {
                        kept_call = true;
                        true
                    }
                    _ => true,
                })
                .cloned()
                .collect();
            ProviderMessage {
                role: candidate.role,
                parts,
                raw: None,
            }
        }
        None => ProviderMessage::function_call(dispatched.clone()),
    }
}

/// Checks presence of both fields, then the identifier shape.
fn validate(request: &ChatRequest) -> Result<(String, UserId), SparkError> {
    let message = request
        .message
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .ok_or(SparkError::MissingField { field: "message" })?;
    let user_id = request
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or(SparkError::MissingField { field: "userId" })?;
    let user_id = UserId::parse(user_id)?;
    Ok((message.to_string(), user_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use spark_test_utils::{MemoryCatalog, MemoryConversations, MockProvider, MockReply};
    use tracing_test::traced_test;

    const USER: &str = "shopper@example.com";

    struct Fixture {
        provider: Arc<MockProvider>,
        conversations: Arc<MemoryConversations>,
        orchestrator: Orchestrator,
    }

    fn catalog() -> Arc<MemoryCatalog> {
        Arc::new(MemoryCatalog::with_products(vec![
            json!({
                "product_id": "tv-1", "product_name": "55\" 4K Smart TV", "brand": "Vizio",
                "final_price": "399.99", "rating": "4.8", "review_count": 2300,
                "category_name": "Electronics", "root_category_name": "Electronics"
            }),
            json!({
                "product_id": "lamp-1", "product_name": "Desk Lamp", "brand": "Lumo",
                "final_price": 19.99, "rating": 4.7, "review_count": 812,
                "category_name": "Lighting", "root_category_name": "Home"
            }),
        ]))
    }

    fn fixture(script: Vec<MockReply>) -> Fixture {
        fixture_with(script, OrchestratorSettings::default())
    }

    fn fixture_with(script: Vec<MockReply>, settings: OrchestratorSettings) -> Fixture {
        let provider = Arc::new(MockProvider::with_script(script));
        let conversations = Arc::new(MemoryConversations::new());
        let mut registry = ToolRegistry::new();
        spark_catalog::register_catalog_tools(&mut registry, catalog()).unwrap();
        let orchestrator = Orchestrator::new(
            provider.clone(),
            conversations.clone(),
            Arc::new(registry),
            settings,
        );
        Fixture {
            provider,
            conversations,
            orchestrator,
        }
    }

    fn function_response(message: &ProviderMessage) -> &Value {
        match &message.parts[0] {
            ContentPart::FunctionResponse { response, .. } => response,
            other => panic!("expected function response, got {other:?}"),
        }
    }

    #[test]
    fn turn_state_display() {
        assert_eq!(TurnState::HistoryLoaded.to_string(), "history_loaded");
        assert_eq!(TurnState::Failed.to_string(), "failed");
    }

    #[tokio::test]
    async fn direct_text_reply_skips_tools() {
        let f = fixture(vec![MockReply::text("Hi! What are you shopping for?")]);
        let reply = f
            .orchestrator
            .handle_turn(ChatRequest::new("hello", USER))
            .await
            .unwrap();

        assert_eq!(reply.reply, "Hi! What are you shopping for?");
        assert!(reply.data.is_none());
        assert!(reply.tool.is_none());

        let requests = f.provider.requests().await;
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.model, "gemini-2.5-flash");
        assert!(request.system_instruction.as_deref().unwrap().starts_with("You are Spark"));
        assert_eq!(request.tools.len(), 5);
        assert_eq!(request.messages, vec![ProviderMessage::text(Role::User, "hello")]);
    }

    #[tokio::test]
    async fn missing_fields_fail_before_any_call() {
        let f = fixture(vec![]);
        for request in [
            ChatRequest {
                user_id: Some(USER.into()),
                ..ChatRequest::default()
            },
            ChatRequest {
                message: Some("hi".into()),
                ..ChatRequest::default()
            },
            ChatRequest::new("   ", USER),
            ChatRequest::new("hi", ""),
        ] {
            let err = f.orchestrator.handle_turn(request).await.unwrap_err();
            assert!(matches!(err, SparkError::MissingField { .. }), "got {err:?}");
            assert_eq!(err.error_code(), "MISSING_REQUIRED_FIELDS");
        }
        assert_eq!(f.provider.call_count().await, 0);
        assert!(f.conversations.turns().await.is_empty());
    }

    #[tokio::test]
    async fn invalid_user_id_is_rejected() {
        let f = fixture(vec![]);
        let err = f
            .orchestrator
            .handle_turn(ChatRequest::new("hi", "not a user!"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_USER_ID");
        assert_eq!(f.provider.call_count().await, 0);
    }

    #[tokio::test]
    async fn tool_call_round_trip_returns_data() {
        let f = fixture(vec![
            MockReply::call("findProducts", json!({"query": "tv", "priceRange": {"max": 500}})),
            MockReply::text("The Vizio 55\" TV is $399.99."),
        ]);
        let reply = f
            .orchestrator
            .handle_turn(ChatRequest::new("any TVs under $500?", USER))
            .await
            .unwrap();

        assert_eq!(reply.reply, "The Vizio 55\" TV is $399.99.");
        assert_eq!(reply.tool.as_deref(), Some("findProducts"));
        let data = reply.data.unwrap();
        assert_eq!(data.as_array().unwrap().len(), 1);
        assert_eq!(data[0]["product_id"], "tv-1");

        let requests = f.provider.requests().await;
        assert_eq!(requests.len(), 2);
        let second = &requests[1].messages;
        assert_eq!(second.len(), 3);
        assert_eq!(second[1].role, Role::Model);
        assert!(matches!(&second[1].parts[0], ContentPart::FunctionCall(c) if c.name == "findProducts"));
        assert_eq!(second[2].role, Role::User);
        assert_eq!(function_response(&second[2])["result"], data);
    }

    #[tokio::test]
    async fn unknown_tool_still_produces_reply() {
        let f = fixture(vec![
            MockReply::call("placeOrder", json!({"product_id": "tv-1"})),
            MockReply::text("Sorry, I can't place orders."),
        ]);
        let reply = f
            .orchestrator
            .handle_turn(ChatRequest::new("buy the TV", USER))
            .await
            .unwrap();

        assert_eq!(reply.reply, "Sorry, I can't place orders.");
        assert!(reply.data.is_none());

        let requests = f.provider.requests().await;
        let result = &function_response(&requests[1].messages[2])["result"];
        assert_eq!(result["error"], true);
        assert!(result["message"].as_str().unwrap().contains("placeOrder"));
    }

    #[tokio::test]
    async fn invalid_arguments_are_shown_to_model() {
        let f = fixture(vec![
            MockReply::call("getProductDetails", json!({})),
            MockReply::text("Which product do you mean?"),
        ]);
        let reply = f
            .orchestrator
            .handle_turn(ChatRequest::new("details please", USER))
            .await
            .unwrap();
        assert_eq!(reply.reply, "Which product do you mean?");

        let requests = f.provider.requests().await;
        let result = &function_response(&requests[1].messages[2])["result"];
        assert_eq!(result["error"], true);
    }

    #[tokio::test]
    async fn non_list_payload_is_not_returned_as_data() {
        let f = fixture(vec![
            MockReply::call("getProductDetails", json!({"product_id": "lamp-1"})),
            MockReply::text("It's a desk lamp."),
        ]);
        let reply = f
            .orchestrator
            .handle_turn(ChatRequest::new("tell me about lamp-1", USER))
            .await
            .unwrap();
        assert_eq!(reply.tool.as_deref(), Some("getProductDetails"));
        assert!(reply.data.is_none());
    }

    #[tokio::test]
    async fn first_call_failure_is_fatal_and_nothing_persisted() {
        let f = fixture(vec![MockReply::fail("upstream down")]);
        let err = f
            .orchestrator
            .handle_turn(ChatRequest::new("hello", USER))
            .await
            .unwrap_err();
        assert!(matches!(err, SparkError::Provider { .. }));
        assert_eq!(err.error_code(), "INTERNAL_SERVER_ERROR");
        assert!(f.conversations.turns().await.is_empty());
    }

    #[tokio::test]
    async fn second_call_failure_degrades_and_keeps_data() {
        let f = fixture(vec![
            MockReply::call("getTrendingProducts", json!({})),
            MockReply::fail("timeout"),
        ]);
        let reply = f
            .orchestrator
            .handle_turn(ChatRequest::new("what's popular?", USER))
            .await
            .unwrap();

        assert_eq!(reply.reply, SECOND_PASS_FAILURE_REPLY);
        let data = reply.data.unwrap();
        assert_eq!(data[0]["product_id"], "tv-1");

        let turns = f.conversations.turns().await;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].content, SECOND_PASS_FAILURE_REPLY);
    }

    #[tokio::test]
    async fn empty_reply_is_replaced() {
        let f = fixture(vec![MockReply::text("   ")]);
        let reply = f
            .orchestrator
            .handle_turn(ChatRequest::new("hmm", USER))
            .await
            .unwrap();
        assert_eq!(reply.reply, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn empty_second_pass_is_replaced() {
        let f = fixture(vec![
            MockReply::call("getTrendingProducts", json!({"limit": 1})),
            MockReply::text(""),
        ]);
        let reply = f
            .orchestrator
            .handle_turn(ChatRequest::new("trending?", USER))
            .await
            .unwrap();
        assert_eq!(reply.reply, FALLBACK_REPLY);
        assert!(reply.data.is_some());
    }

    #[tokio::test]
    #[traced_test]
    async fn only_first_of_several_calls_is_dispatched() {
        let f = fixture(vec![
            MockReply::calls(vec![
                FunctionCall {
                    name: "getProductDetails".into(),
                    args: json!({"product_id": "tv-1"}),
                },
                FunctionCall {
                    name: "getProductReviews".into(),
                    args: json!({"product_id": "tv-1"}),
                },
            ]),
            MockReply::text("Here are the details."),
        ]);
        let reply = f
            .orchestrator
            .handle_turn(ChatRequest::new("details and reviews for tv-1", USER))
            .await
            .unwrap();

        assert_eq!(reply.tool.as_deref(), Some("getProductDetails"));
        let requests = f.provider.requests().await;
        assert_eq!(requests.len(), 2);
        let responses: Vec<_> = requests[1]
            .messages
            .iter()
            .flat_map(|m| &m.parts)
            .filter(|p| matches!(p, ContentPart::FunctionResponse { .. }))
            .collect();
        assert_eq!(responses.len(), 1);

        let calls: Vec<&FunctionCall> = requests[1]
            .messages
            .iter()
            .flat_map(|m| &m.parts)
            .filter_map(|p| match p {
                ContentPart::FunctionCall(call) => Some(call),
                _ => None,
            })
            .collect();
        assert_eq!(calls.len(), responses.len());
        assert_eq!(calls[0].name, "getProductDetails");
        assert!(logs_contain("dispatching only the first"));
    }

    #[test]
    fn recorded_call_drops_undispatched_calls_and_native_form() {
        let details = FunctionCall {
            name: "getProductDetails".into(),
            args: json!({"product_id": "tv-1"}),
        };
        let reviews = FunctionCall {
            name: "getProductReviews".into(),
            args: json!({"product_id": "tv-1"}),
        };
        let response = ProviderResponse {
            function_calls: vec![details.clone(), reviews.clone()],
            candidate_content: Some(ProviderMessage {
                role: Role::Model,
                parts: vec![
                    ContentPart::Text("Let me look.".into()),
                    ContentPart::FunctionCall(details.clone()),
                    ContentPart::FunctionCall(reviews),
                ],
                raw: Some(json!({"role": "model", "parts": []})),
            }),
            ..ProviderResponse::default()
        };

        let recorded = recorded_call(&response, &details);
        assert_eq!(recorded.raw, None);
        assert_eq!(
            recorded.parts,
            vec![
                ContentPart::Text("Let me look.".into()),
                ContentPart::FunctionCall(details.clone()),
            ]
        );

        let single = ProviderResponse {
            function_calls: vec![details.clone()],
            candidate_content: response.candidate_content.clone(),
            ..ProviderResponse::default()
        };
        assert_eq!(recorded_call(&single, &details).raw, single.candidate_content.unwrap().raw);
    }

    #[tokio::test]
    async fn history_is_prepended_oldest_first_and_limited() {
        let settings = OrchestratorSettings {
            history_limit: 2,
            ..OrchestratorSettings::default()
        };
        let f = fixture_with(
            vec![MockReply::text("one"), MockReply::text("two")],
            settings,
        );

        f.orchestrator
            .handle_turn(ChatRequest::new("first", USER))
            .await
            .unwrap();
        f.orchestrator
            .handle_turn(ChatRequest::new("second", USER))
            .await
            .unwrap();

        let requests = f.provider.requests().await;
        let texts: Vec<_> = requests[1].messages.iter().map(|m| m.text_content()).collect();
        assert_eq!(texts, vec!["first", "one", "second"]);
        assert_eq!(requests[1].messages[1].role, Role::Model);
    }

    #[tokio::test]
    #[traced_test]
    async fn history_read_failure_is_not_fatal() {
        let f = fixture(vec![MockReply::text("Hello again")]);
        f.conversations.fail_reads(true);

        let reply = f
            .orchestrator
            .handle_turn(ChatRequest::new("hi", USER))
            .await
            .unwrap();
        assert_eq!(reply.reply, "Hello again");
        assert_eq!(f.provider.requests().await[0].messages.len(), 1);
        assert!(logs_contain("failed to load conversation history"));
    }

    #[tokio::test]
    #[traced_test]
    async fn persistence_failure_is_logged_not_fatal() {
        let f = fixture(vec![MockReply::text("Still here")]);
        f.conversations.fail_writes(true);

        let reply = f
            .orchestrator
            .handle_turn(ChatRequest::new("hi", USER))
            .await
            .unwrap();
        assert_eq!(reply.reply, "Still here");
        assert!(f.conversations.turns().await.is_empty());
        assert!(logs_contain("failed to persist conversation turn"));
    }

    #[tokio::test]
    async fn persists_user_then_model_turn_in_order() {
        let f = fixture(vec![MockReply::text("Welcome!")]);
        let reply = f
            .orchestrator
            .handle_turn(ChatRequest::new("hi", "+1 (555) 010-2000").with_session("s-1"))
            .await
            .unwrap();

        let turns = f.conversations.turns().await;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "hi");
        assert_eq!(turns[1].role, Role::Model);
        assert_eq!(turns[1].content, "Welcome!");
        assert!(turns[0].timestamp < turns[1].timestamp);
        assert_eq!(turns[1].timestamp, reply.timestamp);
        assert_eq!(turns[0].session_id.as_deref(), Some("s-1"));
        assert_eq!(reply.session_id, "s-1");
    }

    #[tokio::test]
    async fn back_to_back_turns_keep_strict_order() {
        let f = fixture(vec![
            MockReply::text("a"),
            MockReply::text("b"),
            MockReply::text("c"),
        ]);
        for message in ["1", "2", "3"] {
            f.orchestrator
                .handle_turn(ChatRequest::new(message, USER))
                .await
                .unwrap();
        }

        let turns = f.conversations.turns().await;
        let contents: Vec<&str> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["1", "a", "2", "b", "3", "c"]);
        assert!(turns.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[tokio::test]
    async fn session_id_is_generated_when_absent() {
        let f = fixture(vec![MockReply::text("ok")]);
        let reply = f
            .orchestrator
            .handle_turn(ChatRequest::new("hi", USER))
            .await
            .unwrap();
        let millis = reply.session_id.strip_prefix("session_").unwrap();
        assert!(millis.parse::<i64>().is_ok());
    }

    #[tokio::test]
    async fn history_validates_identifier() {
        let f = fixture(vec![MockReply::text("ok")]);
        f.orchestrator
            .handle_turn(ChatRequest::new("hi", USER))
            .await
            .unwrap();

        let turns = f.orchestrator.history(USER, 10).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);

        let err = f.orchestrator.history("??", 10).await.unwrap_err();
        assert!(matches!(err, SparkError::InvalidIdentifier { .. }));
    }
}
