// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn orchestration for the Spark shopping assistant.
//!
//! The [`Orchestrator`] runs one user turn to completion: it loads recent
//! history, asks the model for a reply, dispatches at most one tool call,
//! feeds the result back for a second pass, and persists the exchange.

pub mod orchestrator;
pub mod prompt;
pub mod shutdown;

pub use orchestrator::{
    ChatReply, ChatRequest, FALLBACK_REPLY, Orchestrator, OrchestratorSettings,
    SECOND_PASS_FAILURE_REPLY, TurnState,
};
