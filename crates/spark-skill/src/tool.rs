// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The [`Tool`] trait and the result shape fed back to the model.

use async_trait::async_trait;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use spark_core::SparkError;

/// A named, schema-described, server-side function.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool's unique name (used for lookup and API serialization).
    fn name(&self) -> &str;

    /// Returns a natural-language description shown to the model.
    fn description(&self) -> &str;

    /// Returns the JSON Schema describing the tool's input parameters.
    fn parameters_schema(&self) -> Value;

    /// Runs the tool with arguments that already passed schema validation.
    async fn invoke(&self, args: Value) -> Result<Value, SparkError>;
}

/// Outcome of one dispatched tool call.
///
/// Serializes as the success payload itself, or as
/// `{"error": true, "message": ...}` for a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Success(Value),
    Failure { message: String },
}

impl ToolResult {
    pub fn failure(message: impl Into<String>) -> Self {
        ToolResult::Failure {
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolResult::Failure { .. })
    }

    /// The list payload of a successful call, if it produced one.
    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            ToolResult::Success(Value::Array(items)) => Some(items),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            ToolResult::Success(value) => value.clone(),
            ToolResult::Failure { message } => serde_json::json!({
                "error": true,
                "message": message,
            }),
        }
    }
}

impl Serialize for ToolResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ToolResult::Success(value) => value.serialize(serializer),
            ToolResult::Failure { message } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("error", &true)?;
                map.serialize_entry("message", message)?;
                map.end()
            }
        }
    }
}
