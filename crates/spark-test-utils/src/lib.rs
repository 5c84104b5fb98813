// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Spark integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockProvider`] - Scripted model provider that records every request
//! - [`MemoryCatalog`] / [`MemoryConversations`] - In-memory stores with failure switches
//! - [`TestHarness`] - Orchestrator over a temp SQLite database and a mock provider

pub mod harness;
pub mod memory;
pub mod mock_provider;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use memory::{MemoryCatalog, MemoryConversations};
pub use mock_provider::{MockProvider, MockReply};
