// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only product lookups exposed to the model as tools.

pub mod coerce;
pub mod product;
pub mod tools;


pub use product::ProductSummary;
pub use tools::{
    FindProducts, GetProductDetails, GetProductReviews, GetProductsByCategory,
    GetTrendingProducts, register_catalog_tools,
};
