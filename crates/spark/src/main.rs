// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Spark - a tool-augmented shopping assistant.
//!
//! This is the binary entry point for the Spark service.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod config_cmd;
mod seed;
mod serve;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use spark_config::{ConfigError, SparkConfig};

/// Spark - a tool-augmented shopping assistant.
#[derive(Parser, Debug)]
#[command(name = "spark", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the assistant HTTP server.
    Serve,
    /// Import product records from a JSON file into the catalog.
    Seed {
        /// JSON array of products, or an object with a `products` array.
        file: PathBuf,
    },
    /// Validate the effective configuration.
    Config {
        /// Print the configuration with secrets redacted.
        #[arg(long)]
        show: bool,
    },
}

fn load_config(path: Option<&Path>) -> Result<SparkConfig, Vec<ConfigError>> {
    match path {
        Some(path) => spark_config::load_and_validate_path(path),
        None => spark_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            spark_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => {
            serve::init_tracing(&config.agent.log_level);
            serve::run_serve(config).await
        }
        Some(Commands::Seed { file }) => {
            serve::init_tracing(&config.agent.log_level);
            seed::run_seed(config, &file).await
        }
        Some(Commands::Config { show }) => config_cmd::run_config(&config, show),
        None => {
            println!("spark: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
