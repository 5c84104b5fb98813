// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Spark shopping assistant.
//!
//! This crate provides the error taxonomy, the conversation and model types,
//! and the adapter traits that the storage, provider, and orchestration
//! crates plug into.

pub mod error;
pub mod traits;
pub mod types;

pub use error::SparkError;
pub use types::{
    AdapterType, ContentPart, ConversationTurn, FunctionCall, HealthStatus, ProviderMessage,
    ProviderRequest, ProviderResponse, Role, TokenUsage, ToolDeclaration, UserId,
};

pub use traits::{CatalogStore, ConversationStore, PluginAdapter, ProviderAdapter};

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn only_input_errors_reach_the_caller_as_400() {
        let client = [
            SparkError::MissingField { field: "message" },
            SparkError::InvalidIdentifier {
                value: "nope".into(),
            },
        ];
        let server = [
            SparkError::Config("no api key".into()),
            SparkError::storage(std::io::Error::other("locked")),
            SparkError::Provider {
                message: "quota".into(),
                source: None,
            },
            SparkError::UnknownTool {
                name: "addToCart".into(),
            },
            SparkError::InvalidArguments {
                tool: "findProducts".into(),
                message: "query is required".into(),
            },
            SparkError::ToolExecution {
                tool: "getProductDetails".into(),
                message: "scan failed".into(),
            },
            SparkError::Internal("bind".into()),
        ];

        assert!(client.iter().all(SparkError::is_client_error));
        assert!(!server.iter().any(SparkError::is_client_error));
    }

    #[test]
    fn adapter_type_parses_its_own_display() {
        for kind in [AdapterType::Provider, AdapterType::Storage] {
            assert_eq!(AdapterType::from_str(&kind.to_string()).unwrap(), kind);
        }
    }

    #[test]
    fn degraded_health_is_distinct_from_healthy() {
        assert_ne!(HealthStatus::Degraded("slow disk".into()), HealthStatus::Healthy);
        assert_ne!(
            HealthStatus::Unhealthy("db closed".into()),
            HealthStatus::Degraded("db closed".into())
        );
    }

    #[test]
    fn store_and_provider_traits_are_object_safe() {
        fn _provider(_: &dyn ProviderAdapter) {}
        fn _catalog(_: &dyn CatalogStore) {}
        fn _conversations(_: &dyn ConversationStore) {}
    }
}
