// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! System instruction for the shopping assistant.

use spark_config::model::AgentConfig;
use tracing::{info, warn};

/// The built-in "Spark" persona.
///
/// Product facts must come from tool results, never from the model's own
/// knowledge, and the assistant cannot place orders.
pub fn default_system_instruction() -> String {
    "\
You are Spark, the friendly shopping assistant for an online store.

How you talk:
- Be warm, upbeat and conversational. Keep answers short and easy to scan.
- Ask a brief follow-up question when a request is ambiguous.

What you know:
- Every product fact you mention (names, prices, ratings, reviews, availability) \
must come from a tool result in this conversation. Never invent products, prices or reviews.
- If a tool returns nothing or reports an error, say so plainly and suggest another search.

Which tool to use:
- findProducts for searches by keyword, with an optional category or price range.
- getProductDetails when the shopper asks about one specific product.
- getProductReviews for what other customers think of a product.
- getProductsByCategory to browse a whole category.
- getTrendingProducts for popular or best-rated items.

Boundaries:
- Stay on shopping topics. Politely steer unrelated questions back to the store.
- You cannot add items to a cart, take payment or complete a purchase. \
Tell the shopper to do that in the storefront."
        .to_string()
}

/// Resolves the system instruction: file > inline > built-in default.
///
/// An unreadable or empty prompt file falls back to the next source.
pub async fn resolve_system_prompt(agent: &AgentConfig) -> String {
    if let Some(file_path) = &agent.system_prompt_file {
        match tokio::fs::read_to_string(file_path).await {
            Ok(content) => {
                let trimmed = content.trim();
                if !trimmed.is_empty() {
                    info!(path = file_path, "loaded system prompt from file");
                    return trimmed.to_string();
                }
                warn!(path = file_path, "system prompt file is empty, falling back");
            }
            Err(e) => {
                warn!(
                    path = file_path,
                    error = %e,
                    "failed to read system prompt file, falling back"
                );
            }
        }
    }

    if let Some(prompt) = &agent.system_prompt
        && !prompt.trim().is_empty()
    {
        return prompt.clone();
    }

    default_system_instruction()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_instruction_names_persona_and_tools() {
        let prompt = default_system_instruction();
        assert!(prompt.starts_with("You are Spark"));
        for tool in [
            "findProducts",
            "getProductDetails",
            "getProductReviews",
            "getProductsByCategory",
            "getTrendingProducts",
        ] {
            assert!(prompt.contains(tool), "missing {tool}");
        }
        assert!(prompt.contains("Never invent"));
        assert!(prompt.contains("cannot add items to a cart"));
    }

    #[tokio::test]
    async fn default_when_nothing_configured() {
        let prompt = resolve_system_prompt(&AgentConfig::default()).await;
        assert_eq!(prompt, default_system_instruction());
    }

    #[tokio::test]
    async fn inline_overrides_default() {
        let agent = AgentConfig {
            system_prompt: Some("Be terse.".into()),
            ..AgentConfig::default()
        };
        assert_eq!(resolve_system_prompt(&agent).await, "Be terse.");
    }

    #[tokio::test]
    async fn file_overrides_inline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.md");
        std::fs::write(&path, "  File-based prompt.\n").unwrap();

        let agent = AgentConfig {
            system_prompt: Some("Inline prompt.".into()),
            system_prompt_file: Some(path.to_string_lossy().into_owned()),
            ..AgentConfig::default()
        };
        assert_eq!(resolve_system_prompt(&agent).await, "File-based prompt.");
    }

    #[tokio::test]
    async fn missing_file_falls_back_to_inline() {
        let agent = AgentConfig {
            system_prompt: Some("Fallback prompt.".into()),
            system_prompt_file: Some("/nonexistent/path/prompt.md".into()),
            ..AgentConfig::default()
        };
        assert_eq!(resolve_system_prompt(&agent).await, "Fallback prompt.");
    }

    #[tokio::test]
    async fn empty_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.md");
        std::fs::write(&path, "   \n").unwrap();

        let agent = AgentConfig {
            system_prompt_file: Some(path.to_string_lossy().into_owned()),
            ..AgentConfig::default()
        };
        assert_eq!(resolve_system_prompt(&agent).await, default_system_instruction());
    }
}
