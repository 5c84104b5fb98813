// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity and lifecycle shared by every adapter.

use async_trait::async_trait;

use crate::error::SparkError;
use crate::types::{AdapterType, HealthStatus};

/// Implemented by the model provider and the storage backend so the binary
/// can report on them and close them uniformly at shutdown.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Short identifier used in logs, e.g. `"sqlite"`.
    fn name(&self) -> &str;

    fn version(&self) -> semver::Version;

    fn adapter_type(&self) -> AdapterType;

    async fn health_check(&self) -> Result<HealthStatus, SparkError>;

    /// Flushes and releases resources. Safe to call more than once.
    async fn shutdown(&self) -> Result<(), SparkError>;
}
