// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Product document operations.
//!
//! Documents are stored verbatim as JSON text. Only the id and the two
//! normalized category keys are lifted into columns.

use rusqlite::{OptionalExtension, params};
use serde_json::Value;
use spark_core::SparkError;
use spark_core::types::normalize_category;

use crate::database::{Database, map_tr_err};

/// Extracts the primary key of a product document.
///
/// Accepts string ids and integral numeric ids; numbers are keyed by their
/// decimal text so `12` and `"12"` address the same record.
pub fn product_key(document: &Value) -> Option<String> {
    match document.get("product_id")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => n
            .as_u64()
            .map(|v| v.to_string())
            .or_else(|| n.as_i64().map(|v| v.to_string()))
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| format!("{f:.0}"))),
        _ => None,
    }
}

fn category_field(document: &Value, field: &str) -> Option<String> {
    document
        .get(field)
        .and_then(Value::as_str)
        .map(normalize_category)
}

fn decode_document(text: String) -> rusqlite::Result<Value> {
    serde_json::from_str(&text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Insert or replace a batch of products in one transaction. Returns their ids.
pub async fn upsert_products(
    db: &Database,
    documents: Vec<Value>,
) -> Result<Vec<String>, SparkError> {
    let mut rows = Vec::with_capacity(documents.len());
    for (index, document) in documents.into_iter().enumerate() {
        if !document.is_object() {
            return Err(SparkError::Internal(format!(
                "product #{index} is not a JSON object"
            )));
        }
        let id = product_key(&document).ok_or_else(|| {
            SparkError::Internal(format!("product #{index} has no usable `product_id`"))
        })?;
        let category = category_field(&document, "category_name");
        let root = category_field(&document, "root_category_name");
        rows.push((id, category, root, document.to_string()));
    }

    let sql = format!(
        "INSERT INTO {} (product_id, category_key, root_category_key, document)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(product_id) DO UPDATE SET
             category_key = excluded.category_key,
             root_category_key = excluded.root_category_key,
             document = excluded.document",
        db.tables().products()
    );

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let mut ids = Vec::with_capacity(rows.len());
            {
                let mut stmt = tx.prepare(&sql)?;
                for (id, category, root, document) in rows {
                    stmt.execute(params![id, category, root, document])?;
                    ids.push(id);
                }
            }
            tx.commit()?;
            Ok(ids)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch one product document by id.
pub async fn get_product(db: &Database, product_id: &str) -> Result<Option<Value>, SparkError> {
    let product_id = product_id.trim().to_string();
    let sql = format!(
        "SELECT document FROM {} WHERE product_id = ?1",
        db.tables().products()
    );
    db.connection()
        .call(move |conn| {
            let text: Option<String> = conn
                .query_row(&sql, params![product_id], |row| row.get(0))
                .optional()?;
            text.map(decode_document).transpose()
        })
        .await
        .map_err(map_tr_err)
}

/// Scan all products, optionally restricted to a category or root category.
pub async fn scan_products(
    db: &Database,
    category: Option<&str>,
) -> Result<Vec<Value>, SparkError> {
    let table = db.tables().products().to_string();
    let category = category.map(normalize_category);
    db.connection()
        .call(move |conn| {
            let mut out = Vec::new();
            match category {
                Some(key) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT document FROM {table}
                         WHERE category_key = ?1 OR root_category_key = ?1
                         ORDER BY product_id"
                    ))?;
                    let rows = stmt.query_map(params![key], |row| row.get::<_, String>(0))?;
                    for row in rows {
                        out.push(decode_document(row?)?);
                    }
                }
                None => {
                    let mut stmt =
                        conn.prepare(&format!("SELECT document FROM {table} ORDER BY product_id"))?;
                    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                    for row in rows {
                        out.push(decode_document(row?)?);
                    }
                }
            }
            Ok(out)
        })
        .await
        .map_err(map_tr_err)
}

/// Exact category lookup through the category index.
pub async fn query_category(
    db: &Database,
    category: &str,
    limit: usize,
) -> Result<Vec<Value>, SparkError> {
    let key = normalize_category(category);
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let sql = format!(
        "SELECT document FROM {} WHERE category_key = ?1 ORDER BY product_id LIMIT ?2",
        db.tables().products()
    );
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![key, limit], |row| row.get::<_, String>(0))?;
            let mut out = Vec::new();
            for row in rows {
                out.push(decode_document(row?)?);
            }
            Ok(out)
        })
        .await
        .map_err(map_tr_err)
}

/// Number of stored products.
pub async fn count_products(db: &Database) -> Result<u64, SparkError> {
    let sql = format!("SELECT COUNT(*) FROM {}", db.tables().products());
    db.connection()
        .call(move |conn| {
            let n: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
            Ok(n.max(0) as u64)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TableNames;
    use serde_json::json;

    async fn setup() -> Database {
        let db = Database::open_in_memory(TableNames::default()).await.unwrap();
        upsert_products(
            &db,
            vec![
                json!({"product_id": "p1", "product_name": "Smart TV", "category_name": "Electronics", "root_category_name": "Home"}),
                json!({"product_id": 2, "product_name": "USB Cable", "category_name": "Electronics Accessories", "root_category_name": "Electronics"}),
                json!({"product_id": "p3", "product_name": "T-Shirt", "category_name": "Clothing"}),
            ],
        )
        .await
        .unwrap();
        db
    }

    #[test]
    fn product_key_accepts_strings_and_integers() {
        assert_eq!(product_key(&json!({"product_id": " a1 "})).as_deref(), Some("a1"));
        assert_eq!(product_key(&json!({"product_id": 42})).as_deref(), Some("42"));
        assert_eq!(product_key(&json!({"product_id": 42.0})).as_deref(), Some("42"));
        assert_eq!(product_key(&json!({"product_id": 4.2})), None);
        assert_eq!(product_key(&json!({"name": "x"})), None);
    }

    #[tokio::test]
    async fn get_by_id_returns_stored_document() {
        let db = setup().await;
        let doc = get_product(&db, "2").await.unwrap().expect("numeric id stored as text");
        assert_eq!(doc["product_name"], "USB Cable");
        assert!(get_product(&db, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn scan_filters_on_category_or_root_category() {
        let db = setup().await;
        let all = scan_products(&db, None).await.unwrap();
        assert_eq!(all.len(), 3);

        let electronics = scan_products(&db, Some("electronics")).await.unwrap();
        let names: Vec<&str> = electronics
            .iter()
            .filter_map(|d| d["product_name"].as_str())
            .collect();
        assert_eq!(names, vec!["USB Cable", "Smart TV"]);
    }

    #[tokio::test]
    async fn category_index_is_exact() {
        let db = setup().await;
        let hits = query_category(&db, " Electronics ", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["product_name"], "Smart TV");
    }

    #[tokio::test]
    async fn upsert_replaces_existing_document() {
        let db = setup().await;
        upsert_products(
            &db,
            vec![json!({"product_id": "p1", "product_name": "Smart TV 2", "category_name": "Electronics"})],
        )
        .await
        .unwrap();
        assert_eq!(count_products(&db).await.unwrap(), 3);
        let doc = get_product(&db, "p1").await.unwrap().unwrap();
        assert_eq!(doc["product_name"], "Smart TV 2");
    }

    #[tokio::test]
    async fn upsert_rejects_documents_without_id() {
        let db = setup().await;
        let err = upsert_products(&db, vec![json!({"product_name": "nameless"})])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("product_id"));
        assert_eq!(count_products(&db).await.unwrap(), 3);
    }
}
