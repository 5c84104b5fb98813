// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `spark config` validates the effective configuration and optionally
//! prints it.

use spark_config::SparkConfig;
use spark_core::SparkError;

const REDACTED: &str = "[REDACTED]";

/// Runs the `spark config [--show]` command. Loading already validated the
/// configuration by the time this is called.
pub fn run_config(config: &SparkConfig, show: bool) -> Result<(), SparkError> {
    if show {
        print!("{}", render_redacted(config)?);
    } else {
        println!("configuration is valid");
    }
    Ok(())
}

/// Serializes the configuration as TOML with secrets masked.
fn render_redacted(config: &SparkConfig) -> Result<String, SparkError> {
    let mut shown = config.clone();
    if shown.gemini.api_key.is_some() {
        shown.gemini.api_key = Some(REDACTED.to_string());
    }
    toml::to_string_pretty(&shown)
        .map_err(|e| SparkError::Config(format!("cannot render configuration: {e}")))
}
