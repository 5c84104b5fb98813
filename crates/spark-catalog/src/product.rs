// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Normalized views of catalog documents.

use std::cmp::Ordering;

use serde::Serialize;
use serde_json::Value;
use spark_core::types::normalize_category;

use crate::coerce::{field_f64, field_u64, number_or_null};

/// The field subset every list-returning lookup produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSummary {
    pub product_id: Value,
    pub product_name: Option<String>,
    pub brand: Option<String>,
    pub final_price: Value,
    pub rating: Value,
    pub category_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_count: Option<u64>,
}

impl ProductSummary {
    pub fn from_document(doc: &Value) -> Self {
        Self {
            product_id: doc.get("product_id").cloned().unwrap_or(Value::Null),
            product_name: text_field(doc, "product_name"),
            brand: text_field(doc, "brand"),
            final_price: number_or_null(field_f64(doc, "final_price")),
            rating: number_or_null(field_f64(doc, "rating")),
            category_name: text_field(doc, "category_name"),
            review_count: field_u64(doc, "review_count"),
        }
    }
}

pub(crate) fn text_field(doc: &Value, key: &str) -> Option<String> {
    doc.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Case-insensitive containment of an already lower-cased needle in any
/// of the searchable text fields.
pub(crate) fn matches_query(doc: &Value, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    ["product_name", "brand", "category_name", "root_category_name"]
        .iter()
        .filter_map(|key| doc.get(*key).and_then(Value::as_str))
        .any(|text| text.to_lowercase().contains(needle))
}

pub(crate) fn in_category(doc: &Value, category: &str) -> bool {
    let wanted = normalize_category(category);
    doc.get("category_name")
        .and_then(Value::as_str)
        .is_some_and(|c| normalize_category(c) == wanted)
}

/// Stable text form of a document's id for tie-breaking.
pub(crate) fn id_text(doc: &Value) -> String {
    match doc.get("product_id") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// Highest rating first, then most reviewed, then by id.
pub(crate) fn trending_order(a: &Value, b: &Value) -> Ordering {
    let rating = |d: &Value| field_f64(d, "rating").unwrap_or(f64::MIN);
    let reviews = |d: &Value| field_u64(d, "review_count").unwrap_or(0);
    rating(b)
        .total_cmp(&rating(a))
        .then_with(|| reviews(b).cmp(&reviews(a)))
        .then_with(|| id_text(a).cmp(&id_text(b)))
}
