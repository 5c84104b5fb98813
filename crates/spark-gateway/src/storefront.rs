// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Catalog records reshaped for the storefront product grid.

use serde::Serialize;
use serde_json::Value;
use spark_catalog::coerce::field_f64;

/// One card in the storefront feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorefrontProduct {
    pub id: Value,
    pub name: String,
    /// List price: `initial_price`, else `final_price`.
    pub price: Option<f64>,
    /// Set only when `final_price` is below the list price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discounted_price: Option<f64>,
    pub image: Option<String>,
    pub rating: Option<f64>,
    pub description: String,
    pub category: String,
}

fn text(doc: &Value, key: &str) -> String {
    doc.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

impl StorefrontProduct {
    pub fn from_document(doc: &Value) -> Self {
        let final_price = field_f64(doc, "final_price");
        let initial_price = field_f64(doc, "initial_price");
        let price = initial_price.or(final_price);
        let discounted_price = match (final_price, initial_price) {
            (Some(f), Some(i)) if f < i => Some(f),
            _ => None,
        };

        let image = doc
            .get("main_image")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| {
                doc.get("image_urls")
                    .and_then(Value::as_array)
                    .and_then(|urls| urls.iter().find_map(Value::as_str))
            })
            .map(str::to_string);

        Self {
            id: doc.get("product_id").cloned().unwrap_or(Value::Null),
            name: text(doc, "product_name"),
            price,
            discounted_price,
            image,
            rating: field_f64(doc, "rating"),
            description: text(doc, "description"),
            category: text(doc, "category_name"),
        }
    }
}
