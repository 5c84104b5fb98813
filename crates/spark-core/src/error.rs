// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Spark shopping assistant.

use thiserror::Error;

/// Stable error code for a request with an absent `message` or `userId`.
pub const CODE_MISSING_REQUIRED_FIELDS: &str = "MISSING_REQUIRED_FIELDS";

/// Stable error code for a `userId` that is neither a phone number nor an email.
pub const CODE_INVALID_USER_ID: &str = "INVALID_USER_ID";

/// Stable error code for every server-side failure.
pub const CODE_INTERNAL_SERVER_ERROR: &str = "INTERNAL_SERVER_ERROR";

/// The primary error type used across all Spark adapter traits and core operations.
#[derive(Debug, Error)]
pub enum SparkError {
    /// Configuration errors (invalid TOML, missing API key, bad table names).
    #[error("configuration error: {0}")]
    Config(String),

    /// A required request field was absent or empty.
    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },

    /// The user identifier matched neither the phone-number nor the email shape.
    #[error("invalid user identifier `{value}`")]
    InvalidIdentifier { value: String },

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Language model errors (transport failure, non-success status, bad body).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The model asked for a tool that is not registered.
    #[error("unknown tool `{name}`")]
    UnknownTool { name: String },

    /// Tool arguments failed validation against the declared parameter schema.
    #[error("invalid arguments for tool `{tool}`: {message}")]
    InvalidArguments { tool: String, message: String },

    /// A tool with the same name is already registered.
    #[error("tool `{name}` is already registered")]
    DuplicateTool { name: String },

    /// A tool implementation failed while running.
    #[error("tool `{tool}` failed: {message}")]
    ToolExecution { tool: String, message: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SparkError {
    /// Wraps any storage-layer error.
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        SparkError::Storage {
            source: Box::new(err),
        }
    }

    /// Returns true for errors caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SparkError::MissingField { .. } | SparkError::InvalidIdentifier { .. }
        )
    }

    /// The stable machine-readable code surfaced at the HTTP boundary.
    pub fn error_code(&self) -> &'static str {
        match self {
            SparkError::MissingField { .. } => CODE_MISSING_REQUIRED_FIELDS,
            SparkError::InvalidIdentifier { .. } => CODE_INVALID_USER_ID,
            _ => CODE_INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_carry_stable_codes() {
        let missing = SparkError::MissingField { field: "userId" };
        assert!(missing.is_client_error());
        assert_eq!(missing.error_code(), "MISSING_REQUIRED_FIELDS");

        let invalid = SparkError::InvalidIdentifier {
            value: "not an id".into(),
        };
        assert!(invalid.is_client_error());
        assert_eq!(invalid.error_code(), "INVALID_USER_ID");
    }

    #[test]
    fn upstream_errors_are_internal() {
        let err = SparkError::Provider {
            message: "503 from model".into(),
            source: None,
        };
        assert!(!err.is_client_error());
        assert_eq!(err.error_code(), "INTERNAL_SERVER_ERROR");
        assert_eq!(
            SparkError::storage(std::io::Error::other("disk")).error_code(),
            "INTERNAL_SERVER_ERROR"
        );
    }

    #[test]
    fn display_names_the_tool() {
        let err = SparkError::UnknownTool {
            name: "deleteEverything".into(),
        };
        assert_eq!(err.to_string(), "unknown tool `deleteEverything`");
    }
}
