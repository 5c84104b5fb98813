// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints that serde attributes cannot express, such as
//! table names being safe SQL identifiers and CORS origins being well formed.

use crate::diagnostic::ConfigError;
use crate::model::SparkConfig;

/// Largest history window the model is ever sent.
pub const MAX_HISTORY_LIMIT: usize = 200;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &SparkConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.agent.history_limit == 0 || config.agent.history_limit > MAX_HISTORY_LIMIT {
        errors.push(ConfigError::validation(format!(
            "agent.history_limit must be between 1 and {MAX_HISTORY_LIMIT}, got {}",
            config.agent.history_limit
        )));
    }

    if config.gemini.model.trim().is_empty() {
        errors.push(ConfigError::validation("gemini.model must not be empty"));
    }

    if !config.gemini.base_url.starts_with("http://")
        && !config.gemini.base_url.starts_with("https://")
    {
        errors.push(ConfigError::validation(format!(
            "gemini.base_url `{}` must be an http(s) URL",
            config.gemini.base_url
        )));
    }

    if config.gemini.timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "gemini.timeout_secs must be greater than 0",
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    for (key, table) in [
        ("storage.products_table", &config.storage.products_table),
        ("storage.chat_history_table", &config.storage.chat_history_table),
    ] {
        if !is_sql_identifier(table) {
            errors.push(ConfigError::validation(format!(
                "{key} `{table}` must start with a letter or underscore and contain only letters, digits, and underscores"
            )));
        }
    }

    if config
        .storage
        .products_table
        .eq_ignore_ascii_case(&config.storage.chat_history_table)
    {
        errors.push(ConfigError::validation(
            "storage.products_table and storage.chat_history_table must differ",
        ));
    }

    let host = config.server.host.trim();
    let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
    let is_valid_hostname = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if !is_valid_ip && !is_valid_hostname {
        errors.push(ConfigError::validation(format!(
            "server.host `{host}` is not a valid IP address or hostname"
        )));
    }

    if config.server.port == 0 {
        errors.push(ConfigError::validation("server.port must not be 0"));
    }

    if config.server.allowed_origins.is_empty() {
        errors.push(ConfigError::validation(
            "server.allowed_origins must list at least one origin",
        ));
    }

    for origin in &config.server.allowed_origins {
        if origin != "*" && !is_http_origin(origin) {
            errors.push(ConfigError::validation(format!(
                "server.allowed_origins entry `{origin}` must be `*` or an http(s) origin without a path"
            )));
        }
    }

    if config.server.history_default_limit == 0
        || config.server.history_default_limit > config.server.history_max_limit
    {
        errors.push(ConfigError::validation(format!(
            "server.history_default_limit must be between 1 and server.history_max_limit ({}), got {}",
            config.server.history_max_limit, config.server.history_default_limit
        )));
    }

    if config.server.max_concurrent_requests == Some(0) {
        errors.push(ConfigError::validation(
            "server.max_concurrent_requests must be greater than 0 when set",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`, so the name can be interpolated into DDL.
pub fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_http_origin(origin: &str) -> bool {
    let rest = origin
        .strip_prefix("https://")
        .or_else(|| origin.strip_prefix("http://"));
    match rest {
        Some(authority) => {
            !authority.is_empty()
                && !authority.contains('/')
                && !authority.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&SparkConfig::default()).is_ok());
    }

    #[test]
    fn sql_identifiers() {
        assert!(is_sql_identifier("products"));
        assert!(is_sql_identifier("_chat_history_v2"));
        assert!(!is_sql_identifier("2products"));
        assert!(!is_sql_identifier("products; DROP TABLE x"));
        assert!(!is_sql_identifier(""));
    }

    #[test]
    fn origins() {
        assert!(is_http_origin("http://localhost:3000"));
        assert!(is_http_origin("https://shop.example.com"));
        assert!(!is_http_origin("https://shop.example.com/app"));
        assert!(!is_http_origin("shop.example.com"));
    }

    #[test]
    fn collects_every_error() {
        let mut config = SparkConfig::default();
        config.agent.history_limit = 0;
        config.storage.products_table = "bad name".into();
        config.server.port = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3, "{errors:?}");
    }

    #[test]
    fn same_table_twice_is_rejected() {
        let mut config = SparkConfig::default();
        config.storage.chat_history_table = "Products".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(
            errors
                .iter()
                .any(|e| e.to_string().contains("must differ"))
        );
    }
}
