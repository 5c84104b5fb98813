// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./spark.toml` > `~/.config/spark/spark.toml` > `/etc/spark/spark.toml`
//! with environment variable overrides.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::SparkConfig;

/// Config sections reachable through `SPARK_<SECTION>_<KEY>` variables.
const SECTIONS: &[&str] = &["agent", "gemini", "storage", "server"];

/// Plain environment names understood for deployment compatibility,
/// with the config key each one sets.
const WELL_KNOWN_ENV: &[(&str, &str)] = &[
    ("gemini_api_key", "gemini.api_key"),
    ("port", "server.port"),
    ("allowed_origins", "server.allowed_origins"),
    ("products_table_name", "storage.products_table"),
    ("chat_history_table_name", "storage.chat_history_table"),
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/spark/spark.toml` (system-wide)
/// 3. `~/.config/spark/spark.toml` (user XDG config)
/// 4. `./spark.toml` (local directory)
/// 5. Well-known plain variables (`GEMINI_API_KEY`, `PORT`, ...)
/// 6. `SPARK_*` environment variables
pub fn load_config() -> Result<SparkConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no environment).
///
/// Used for testing.
pub fn load_config_from_str(toml_content: &str) -> Result<SparkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SparkConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SparkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SparkConfig::default()))
        .merge(Toml::file(path))
        .merge(well_known_env())
        .merge(env_provider())
        .extract()
}

/// TOML files merged by [`load_config`], lowest precedence first.
pub(crate) fn config_file_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/spark/spark.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("spark").join("spark.toml"));
    }
    paths.push(PathBuf::from("spark.toml"));
    paths
}

/// The layered figment behind [`load_config`].
pub fn build_figment() -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(SparkConfig::default()));
    for path in config_file_paths() {
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(well_known_env()).merge(env_provider())
}

/// Provider for the plain, unprefixed variable names.
fn well_known_env() -> Env {
    let names: Vec<&str> = WELL_KNOWN_ENV.iter().map(|(name, _)| *name).collect();
    Env::raw().only(&names).map(|key| {
        let lower = key.as_str().to_ascii_lowercase();
        WELL_KNOWN_ENV
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, target)| (*target).to_string())
            .unwrap_or(lower)
            .into()
    })
}

/// Create the `SPARK_` provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` so underscore-containing
/// keys survive: `SPARK_GEMINI_API_KEY` maps to `gemini.api_key`, not
/// `gemini.api.key`. Variables outside the known sections are ignored.
fn env_provider() -> Env {
    Env::prefixed("SPARK_")
        .filter(|key| {
            let key = key.as_str().to_ascii_lowercase();
            SECTIONS
                .iter()
                .any(|section| key.starts_with(&format!("{section}_")))
        })
        .map(|key| {
            let key = key.as_str().to_ascii_lowercase();
            let mapped = SECTIONS
                .iter()
                .find_map(|section| {
                    key.strip_prefix(&format!("{section}_"))
                        .map(|rest| format!("{section}.{rest}"))
                })
                .unwrap_or(key);
            mapped.into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_variables_map_into_sections() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("GEMINI_API_KEY", "from-env");
            jail.set_env("PORT", "8080");
            jail.set_env("ALLOWED_ORIGINS", "https://a.example,https://b.example");
            jail.set_env("PRODUCTS_TABLE_NAME", "catalog");
            jail.set_env("CHAT_HISTORY_TABLE_NAME", "turns");

            let config = build_figment().extract::<SparkConfig>()?;
            assert_eq!(config.gemini.api_key.as_deref(), Some("from-env"));
            assert_eq!(config.server.port, 8080);
            assert_eq!(
                config.server.allowed_origins,
                vec!["https://a.example", "https://b.example"]
            );
            assert_eq!(config.storage.products_table, "catalog");
            assert_eq!(config.storage.chat_history_table, "turns");
            Ok(())
        });
    }

    #[test]
    fn prefixed_variables_win_over_plain_names() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("PORT", "8080");
            jail.set_env("SPARK_SERVER_PORT", "9090");
            jail.set_env("SPARK_GEMINI_API_KEY", "prefixed");

            let config = build_figment().extract::<SparkConfig>()?;
            assert_eq!(config.server.port, 9090);
            assert_eq!(config.gemini.api_key.as_deref(), Some("prefixed"));
            Ok(())
        });
    }

    #[test]
    fn unrelated_prefixed_variables_are_ignored() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SPARK_UNRELATED", "1");
            let config = build_figment().extract::<SparkConfig>()?;
            assert_eq!(config.agent.name, "spark");
            Ok(())
        });
    }

    #[test]
    fn local_file_is_merged() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "spark.toml",
                r#"
[agent]
history_limit = 8

[storage]
database_path = "/tmp/spark-test.db"
"#,
            )?;
            let config = build_figment().extract::<SparkConfig>()?;
            assert_eq!(config.agent.history_limit, 8);
            assert_eq!(config.storage.database_path, "/tmp/spark-test.db");
            Ok(())
        });
    }
}
