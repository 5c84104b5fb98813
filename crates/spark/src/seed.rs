// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `spark seed` bulk-loads product documents into the catalog table.

use std::path::Path;

use serde_json::Value;
use spark_config::SparkConfig;
use spark_core::{PluginAdapter, SparkError};
use spark_storage::SqliteStorage;
use tracing::info;

/// Runs the `spark seed <FILE>` command.
pub async fn run_seed(config: SparkConfig, file: &Path) -> Result<(), SparkError> {
    let raw = tokio::fs::read_to_string(file).await.map_err(|e| {
        SparkError::Config(format!("cannot read seed file `{}`: {e}", file.display()))
    })?;
    let documents = parse_seed(&raw)?;

    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    let imported = storage.import_products(documents).await?;
    let total = storage.product_count().await?;
    storage.shutdown().await?;

    info!(imported, total, file = %file.display(), "seed complete");
    println!("imported {imported} products ({total} in catalog)");
    Ok(())
}

/// Accepts either a bare JSON array or an object with a `products` array.
fn parse_seed(raw: &str) -> Result<Vec<Value>, SparkError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| SparkError::Config(format!("seed file is not valid JSON: {e}")))?;

    let documents = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("products") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(SparkError::Config(
                    "seed object must contain a `products` array".to_string(),
                ));
            }
        },
        _ => {
            return Err(SparkError::Config(
                "seed file must be a JSON array or an object with a `products` array".to_string(),
            ));
        }
    };

    if let Some(index) = documents.iter().position(|d| !d.is_object()) {
        return Err(SparkError::Config(format!(
            "seed entry {index} is not a JSON object"
        )));
    }

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spark_core::CatalogStore;

    fn config_in(dir: &tempfile::TempDir) -> SparkConfig {
        let mut config = SparkConfig::default();
        config.storage.database_path = dir.path().join("seed.db").display().to_string();
        config
    }

    #[test]
    fn parse_seed_accepts_bare_array() {
        let docs = parse_seed(r#"[{"product_id":"p1"},{"product_id":"p2"}]"#).unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn parse_seed_accepts_products_object() {
        let docs = parse_seed(r#"{"products":[{"product_id":"p1"}],"meta":{}}"#).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["product_id"], "p1");
    }

    #[test]
    fn parse_seed_rejects_other_shapes() {
        assert!(parse_seed("42").is_err());
        assert!(parse_seed(r#"{"items":[]}"#).is_err());
        assert!(parse_seed("not json").is_err());
        let err = parse_seed(r#"[{"product_id":"p1"}, 3]"#).unwrap_err();
        assert!(err.to_string().contains("entry 1"));
    }

    #[tokio::test]
    async fn run_seed_imports_into_configured_database() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("products.json");
        std::fs::write(
            &file,
            r#"{"products":[
                {"product_id":"p1","name":"Kettle","category":"Kitchen","price":29.99},
                {"product_id":"p2","name":"Toaster","category":"Kitchen","price":"24.50"}
            ]}"#,
        )
        .unwrap();
        let config = config_in(&dir);

        run_seed(config.clone(), &file).await.unwrap();

        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await.unwrap();
        assert_eq!(storage.product_count().await.unwrap(), 2);
        let kettle = storage.get_product("p1").await.unwrap().unwrap();
        assert_eq!(kettle["name"], "Kettle");
    }

    #[tokio::test]
    async fn run_seed_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_seed(config_in(&dir), &dir.path().join("absent.json"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cannot read seed file"));
    }
}
