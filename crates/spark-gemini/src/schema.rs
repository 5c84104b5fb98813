// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion from JSON Schema to the Gemini function-declaration schema.
//!
//! The API accepts an OpenAPI subset: type names are upper-case and keywords
//! such as `additionalProperties` or `minimum` are rejected. Tool schemas in
//! Spark are plain JSON Schema, so they are rewritten here on the way out.

use serde_json::{Map, Value};

/// Keywords copied through unchanged.
const KEPT_KEYWORDS: &[&str] = &["description", "required", "enum", "format", "nullable"];

/// Rewrites a JSON Schema document into the Gemini schema dialect.
pub fn to_gemini_schema(schema: &Value) -> Value {
    let Value::Object(obj) = schema else {
        return schema.clone();
    };

    let mut out = Map::new();
    for (key, value) in obj {
        match key.as_str() {
            "type" => convert_type(value, &mut out),
            "properties" => {
                if let Value::Object(props) = value {
                    let converted = props
                        .iter()
                        .map(|(name, prop)| (name.clone(), to_gemini_schema(prop)))
                        .collect();
                    out.insert("properties".into(), Value::Object(converted));
                }
            }
            "items" => {
                out.insert("items".into(), to_gemini_schema(value));
            }
            k if KEPT_KEYWORDS.contains(&k) => {
                out.insert(key.clone(), value.clone());
            }
            _ => {}
        }
    }
    Value::Object(out)
}

fn convert_type(value: &Value, out: &mut Map<String, Value>) {
    match value {
        Value::String(t) => {
            out.insert("type".into(), Value::String(t.to_uppercase()));
        }
        // ["string", "null"] becomes a nullable STRING.
        Value::Array(types) => {
            let mut nullable = false;
            for t in types.iter().filter_map(Value::as_str) {
                if t == "null" {
                    nullable = true;
                } else if !out.contains_key("type") {
                    out.insert("type".into(), Value::String(t.to_uppercase()));
                }
            }
            if nullable {
                out.insert("nullable".into(), Value::Bool(true));
            }
        }
        _ => {}
    }
}
