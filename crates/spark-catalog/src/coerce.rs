// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Numeric coercion for catalog fields.
//!
//! Imported catalogs store prices and ratings as either JSON numbers or
//! text. Every comparison and sort goes through these helpers so the two
//! encodings order consistently.

use serde_json::{Number, Value};

/// Reads a number from a JSON number or a numeric string.
///
/// Strings may carry surrounding whitespace, a leading `$`, and thousands
/// separators. Non-finite values and anything else yield `None`.
pub fn as_f64(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .trim_start_matches('$')
                .chars()
                .filter(|c| *c != ',')
                .collect();
            cleaned.parse::<f64>().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Like [`as_f64`], for counts.
pub fn as_u64(value: &Value) -> Option<u64> {
    let n = as_f64(value)?;
    (n >= 0.0).then(|| n.round() as u64)
}

/// Field `key` of `doc`, coerced.
pub fn field_f64(doc: &Value, key: &str) -> Option<f64> {
    doc.get(key).and_then(as_f64)
}

pub fn field_u64(doc: &Value, key: &str) -> Option<u64> {
    doc.get(key).and_then(as_u64)
}

/// JSON number for `n`, or `null` when absent.
pub fn number_or_null(n: Option<f64>) -> Value {
    n.and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Rewrites the listed fields of an object in place as JSON numbers where parsable.
pub fn coerce_fields(doc: &mut Value, keys: &[&str]) {
    let Some(map) = doc.as_object_mut() else {
        return;
    };
    for key in keys {
        if let Some(slot) = map.get_mut(*key)
            && let Some(n) = as_f64(slot)
        {
            *slot = if n.fract() == 0.0 && n.abs() < 9.0e15 {
                Value::Number(Number::from(n as i64))
            } else {
                number_or_null(Some(n))
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_and_numeric_strings_agree() {
        assert_eq!(as_f64(&json!(19.99)), Some(19.99));
        assert_eq!(as_f64(&json!("19.99")), Some(19.99));
        assert_eq!(as_f64(&json!(" $1,299.00 ")), Some(1299.0));
        assert_eq!(as_f64(&json!("4.7")), Some(4.7));
    }

    #[test]
    fn non_numeric_values_are_absent() {
        assert_eq!(as_f64(&json!("call for price")), None);
        assert_eq!(as_f64(&json!(null)), None);
        assert_eq!(as_f64(&json!("NaN")), None);
        assert_eq!(as_f64(&json!([1])), None);
    }

    #[test]
    fn counts_round_and_reject_negatives() {
        assert_eq!(as_u64(&json!("1,204")), Some(1204));
        assert_eq!(as_u64(&json!(-3)), None);
    }

    #[test]
    fn coerce_fields_rewrites_only_parsable_values() {
        let mut doc = json!({"final_price": "19.99", "review_count": "812", "rating": "n/a"});
        coerce_fields(&mut doc, &["final_price", "review_count", "rating", "missing"]);
        assert_eq!(doc, json!({"final_price": 19.99, "review_count": 812, "rating": "n/a"}));
    }
}
