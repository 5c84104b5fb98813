// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the stores, the model provider, and the orchestrator.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, SubsecRound, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::error::SparkError;

/// Phone number (digits, spaces, dashes, parentheses, optional leading `+`)
/// or a plain `local@domain.tld` email address.
static USER_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+?[0-9\s\-()]+|[A-Za-z0-9_.\-]+@[A-Za-z0-9_.\-]+\.[A-Za-z0-9_]+)$").unwrap()
});

/// A validated conversation owner: a phone number or an email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Validates `raw` against the phone-or-email shape.
    pub fn parse(raw: &str) -> Result<Self, SparkError> {
        if USER_ID_PATTERN.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(SparkError::InvalidIdentifier {
                value: raw.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical form of a category name used for exact category matching.
pub fn normalize_category(category: &str) -> String {
    category.trim().to_lowercase()
}

/// Author of a conversation turn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One persisted message in a user's conversation.
///
/// Turns are append-only. Per user they are totally ordered by `timestamp`,
/// with insertion order breaking ties in storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    /// Creates a turn stamped with the given instant truncated to milliseconds.
    pub fn new(
        user_id: &UserId,
        role: Role,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.as_str().to_string(),
            session_id: None,
            role,
            content: content.into(),
            timestamp: timestamp.trunc_subsecs(3),
        }
    }

    pub fn with_session(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Storage,
}

// --- Provider types ---

/// A structured function-call request emitted by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

/// One part of a provider message.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    FunctionCall(FunctionCall),
    /// The result of a dispatched tool, fed back to the model.
    FunctionResponse { name: String, response: Value },
}

/// A message in the working context sent to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderMessage {
    pub role: Role,
    pub parts: Vec<ContentPart>,
    /// Provider-native form of this message, replayed verbatim when present.
    pub raw: Option<Value>,
}

impl ProviderMessage {
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![ContentPart::Text(text.into())],
            raw: None,
        }
    }

    /// A model message that carries only the given function call.
    pub fn function_call(call: FunctionCall) -> Self {
        Self {
            role: Role::Model,
            parts: vec![ContentPart::FunctionCall(call)],
            raw: None,
        }
    }

    /// A user-role message carrying a tool result back to the model.
    pub fn function_response(name: impl Into<String>, response: Value) -> Self {
        Self {
            role: Role::User,
            parts: vec![ContentPart::FunctionResponse {
                name: name.into(),
                response,
            }],
            raw: None,
        }
    }

    /// Concatenated text parts.
    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl From<&ConversationTurn> for ProviderMessage {
    fn from(turn: &ConversationTurn) -> Self {
        ProviderMessage::text(turn.role, turn.content.clone())
    }
}

/// A callable function advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    /// JSON Schema of the parameters object.
    pub parameters: Value,
}

/// A request to a language model provider.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub model: String,
    pub system_instruction: Option<String>,
    pub messages: Vec<ProviderMessage>,
    pub tools: Vec<ToolDeclaration>,
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A response from a language model provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderResponse {
    /// Concatenated text output, if any.
    pub text: Option<String>,
    /// Function calls in the order the model emitted them.
    pub function_calls: Vec<FunctionCall>,
    /// The candidate message as produced, for replay in the next request.
    pub candidate_content: Option<ProviderMessage>,
    pub usage: Option<TokenUsage>,
    pub finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_phone_numbers_and_emails() {
        for ok in [
            "+1 (555) 010-2030",
            "5550102030",
            "jane.doe@example.com",
            "a_b-c@mail.example.co",
        ] {
            assert!(UserId::parse(ok).is_ok(), "{ok} should be accepted");
        }
    }

    #[test]
    fn rejects_other_shapes() {
        for bad in ["", "hello", "jane@", "@example.com", "555-CALL-NOW", "a b@c.d"] {
            let err = UserId::parse(bad).unwrap_err();
            assert_eq!(err.error_code(), "INVALID_USER_ID", "{bad:?}");
        }
    }

    proptest! {
        #[test]
        fn identifiers_with_letters_and_no_at_sign_are_rejected(s in "[a-zA-Z][a-zA-Z0-9 ]{0,20}") {
            prop_assert!(UserId::parse(&s).is_err());
        }

        #[test]
        fn digit_strings_are_accepted(s in "\\+?[0-9]{3,15}") {
            prop_assert!(UserId::parse(&s).is_ok());
        }
    }

    #[test]
    fn categories_normalize_case_and_whitespace() {
        assert_eq!(normalize_category("  Electronics "), "electronics");
        assert_ne!(normalize_category("Electronics"), normalize_category("Electronics Accessories"));
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(Role::Model.to_string(), "model");
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!("model".parse::<Role>().unwrap(), Role::Model);
    }

    #[test]
    fn turn_serializes_camel_case_with_millisecond_timestamp() {
        let user = UserId::parse("jane@example.com").unwrap();
        let ts = DateTime::parse_from_rfc3339("2026-03-01T10:00:00.123456Z")
            .unwrap()
            .with_timezone(&Utc);
        let turn = ConversationTurn::new(&user, Role::User, "hi", ts);
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["userId"], "jane@example.com");
        assert_eq!(json["role"], "user");
        assert_eq!(json["timestamp"], "2026-03-01T10:00:00.123Z");
        assert!(json.get("sessionId").is_none());
    }

    #[test]
    fn text_content_skips_function_parts() {
        let msg = ProviderMessage {
            role: Role::Model,
            parts: vec![
                ContentPart::Text("Here ".into()),
                ContentPart::FunctionCall(FunctionCall {
                    name: "findProducts".into(),
                    args: serde_json::json!({"query": "tv"}),
                }),
                ContentPart::Text("you go".into()),
            ],
            raw: None,
        };
        assert_eq!(msg.text_content(), "Here you go");
    }
}
