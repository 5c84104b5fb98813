// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP boundary for the Spark shopping assistant.
//!
//! Exposes the orchestrator and the catalog over axum:
//! `POST /chat`, `GET /chat/history/{userId}`, `GET /products`, `GET /health`.

pub mod handlers;
pub mod server;
pub mod storefront;

pub use server::{AppState, build_router, start_server};
pub use storefront::StorefrontProduct;
