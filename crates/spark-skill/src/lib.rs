// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tools the model may ask the assistant to run.
//!
//! The model only ever sees a tool's name, description, and parameter
//! schema. [`ToolRegistry::dispatch`] is the boundary: it rejects unknown
//! names and ill-typed arguments before any implementation runs.

pub mod registry;
pub mod tool;

pub use registry::ToolRegistry;
pub use tool::{Tool, ToolResult};
