// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for hosted language models.

use async_trait::async_trait;

use crate::error::SparkError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ProviderRequest, ProviderResponse};

/// Adapter for a tool-augmented language model.
///
/// A completion takes the working context, the tool declarations, and the
/// system instruction, and returns either free text or function-call
/// requests (or both).
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// One non-streaming model call.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, SparkError>;
}
