// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The five product lookup tools.
//!
//! Each pushes its most selective filter (id or category) down to the
//! store and applies text matching, price bounds, numeric coercion, and
//! sorting after retrieval.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use spark_core::{CatalogStore, SparkError};
use spark_skill::Tool;
use tracing::{debug, error};

use crate::coerce::{coerce_fields, field_f64, field_u64};
use crate::product::{ProductSummary, in_category, matches_query, text_field, trending_order};

/// Upper bound on any lookup's `limit`.
pub const MAX_LIMIT: usize = 50;

/// Trending products must be rated strictly above this.
pub const TRENDING_MIN_RATING: f64 = 4.5;

/// Trending products must have strictly more reviews than this.
pub const TRENDING_MIN_REVIEWS: u64 = 500;

fn clamp_limit(limit: Option<i64>, default: usize) -> usize {
    limit
        .map(|l| l.clamp(1, MAX_LIMIT as i64) as usize)
        .unwrap_or(default)
}

fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, SparkError> {
    serde_json::from_value(args).map_err(|e| SparkError::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

/// Logs the store error and replaces it with the message the model sees.
fn store_failure(tool: &str, message: &str, err: SparkError) -> SparkError {
    error!(tool, error = %err, "catalog lookup failed");
    SparkError::ToolExecution {
        tool: tool.to_string(),
        message: message.to_string(),
    }
}

fn summaries<'a>(docs: impl Iterator<Item = &'a Value>) -> Result<Value, SparkError> {
    let list: Vec<ProductSummary> = docs.map(ProductSummary::from_document).collect();
    serde_json::to_value(list).map_err(|e| SparkError::Internal(e.to_string()))
}

// --- findProducts ---

#[derive(Debug, Deserialize)]
struct PriceRange {
    min: Option<f64>,
    max: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct FindProductsArgs {
    query: String,
    category: Option<String>,
    #[serde(rename = "priceRange")]
    price_range: Option<PriceRange>,
    limit: Option<i64>,
}

/// Free-text search over name, brand, and category with optional price bounds.
pub struct FindProducts {
    store: Arc<dyn CatalogStore>,
}

impl FindProducts {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for FindProducts {
    fn name(&self) -> &str {
        "findProducts"
    }

    fn description(&self) -> &str {
        "Searches the product catalog. Use it for general requests such as 'find me a t-shirt' \
         or narrower ones such as 'a blue shirt under $50'. Matches the query against product \
         name, brand, and category, optionally restricted to a category and a price range."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The shopper's main search term, e.g. 'laptop' or 'running shoes'"
                },
                "category": {
                    "type": "string",
                    "description": "Optional category filter, e.g. 'Electronics' or 'Clothing'"
                },
                "priceRange": {
                    "type": "object",
                    "description": "Optional price bounds in dollars",
                    "properties": {
                        "min": { "type": "number", "description": "Minimum price" },
                        "max": { "type": "number", "description": "Maximum price" }
                    },
                    "additionalProperties": false
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of products to return (default 10)"
                }
            },
            "required": ["query"],
            "additionalProperties": false
        })
    }

    async fn invoke(&self, args: Value) -> Result<Value, SparkError> {
        let args: FindProductsArgs = parse_args(self.name(), args)?;
        let limit = clamp_limit(args.limit, 10);
        let category = args
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());
        let (min, max) = args
            .price_range
            .map(|r| (r.min, r.max))
            .unwrap_or((None, None));

        let docs = self
            .store
            .scan_products(category)
            .await
            .map_err(|e| store_failure(self.name(), "Failed to search for products.", e))?;

        let needle = args.query.trim().to_lowercase();
        let hits = docs
            .iter()
            .filter(|doc| {
                if min.is_none() && max.is_none() {
                    return true;
                }
                match field_f64(doc, "final_price") {
                    Some(price) => {
                        min.is_none_or(|m| price >= m) && max.is_none_or(|m| price <= m)
                    }
                    None => false,
                }
            })
            .filter(|doc| matches_query(doc, &needle))
            .take(limit);

        let result = summaries(hits)?;
        debug!(
            query = %args.query,
            hits = result.as_array().map_or(0, Vec::len),
            "findProducts"
        );
        Ok(result)
    }
}

// --- getProductDetails ---

#[derive(Debug, Deserialize)]
struct ProductIdArgs {
    product_id: String,
}

/// Full record of one product.
pub struct GetProductDetails {
    store: Arc<dyn CatalogStore>,
}

impl GetProductDetails {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }
}

fn product_id_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "product_id": {
                "type": "string",
                "description": description
            }
        },
        "required": ["product_id"],
        "additionalProperties": false
    })
}

#[async_trait]
impl Tool for GetProductDetails {
    fn name(&self) -> &str {
        "getProductDetails"
    }

    fn description(&self) -> &str {
        "Fetches the complete record of one product by its product_id: description, \
         specifications, pricing, and images. Use it once the shopper shows interest in a \
         specific product from earlier results."
    }

    fn parameters_schema(&self) -> Value {
        product_id_schema("The product's unique identifier, taken from an earlier search result")
    }

    async fn invoke(&self, args: Value) -> Result<Value, SparkError> {
        let args: ProductIdArgs = parse_args(self.name(), args)?;
        let product = self
            .store
            .get_product(&args.product_id)
            .await
            .map_err(|e| store_failure(self.name(), "Failed to get product details.", e))?;

        let Some(mut product) = product else {
            return Err(SparkError::ToolExecution {
                tool: self.name().to_string(),
                message: format!("Product ID {} not found.", args.product_id),
            });
        };
        coerce_fields(
            &mut product,
            &["final_price", "initial_price", "rating", "review_count"],
        );
        Ok(product)
    }
}

// --- getProductReviews ---

/// Rating summary and top reviews of one product.
pub struct GetProductReviews {
    store: Arc<dyn CatalogStore>,
}

impl GetProductReviews {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetProductReviews {
    fn name(&self) -> &str {
        "getProductReviews"
    }

    fn description(&self) -> &str {
        "Gets the overall rating, review count, and top customer reviews for one product. \
         Use it when the shopper asks what other people think or about star ratings."
    }

    fn parameters_schema(&self) -> Value {
        product_id_schema("The product's unique identifier")
    }

    async fn invoke(&self, args: Value) -> Result<Value, SparkError> {
        let args: ProductIdArgs = parse_args(self.name(), args)?;
        let product = self
            .store
            .get_product(&args.product_id)
            .await
            .map_err(|e| store_failure(self.name(), "Failed to fetch product reviews.", e))?;

        let Some(product) = product else {
            return Err(SparkError::ToolExecution {
                tool: self.name().to_string(),
                message: format!("No reviews found for product ID {}.", args.product_id),
            });
        };

        Ok(json!({
            "product_name": text_field(&product, "product_name"),
            "overall_rating": field_f64(&product, "rating"),
            "review_count": field_u64(&product, "review_count"),
            "reviews": product.get("top_reviews").cloned().unwrap_or_else(|| json!([])),
        }))
    }
}

// --- getProductsByCategory ---

#[derive(Debug, Deserialize)]
struct CategoryArgs {
    category: String,
    limit: Option<i64>,
}

/// Exact-match category browse through the category index.
pub struct GetProductsByCategory {
    store: Arc<dyn CatalogStore>,
}

impl GetProductsByCategory {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetProductsByCategory {
    fn name(&self) -> &str {
        "getProductsByCategory"
    }

    fn description(&self) -> &str {
        "Lists products in exactly one category, e.g. 'Electronics'. Use it when the shopper \
         wants to browse a category rather than search for something specific."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "category": {
                    "type": "string",
                    "description": "Exact category name"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of products to return (default 20)"
                }
            },
            "required": ["category"],
            "additionalProperties": false
        })
    }

    async fn invoke(&self, args: Value) -> Result<Value, SparkError> {
        let args: CategoryArgs = parse_args(self.name(), args)?;
        let limit = clamp_limit(args.limit, 20);
        let docs = self
            .store
            .query_category(&args.category, limit)
            .await
            .map_err(|e| store_failure(self.name(), "Failed to get products by category.", e))?;

        summaries(
            docs.iter()
                .filter(|doc| in_category(doc, &args.category))
                .take(limit),
        )
    }
}

// --- getTrendingProducts ---

#[derive(Debug, Deserialize)]
struct LimitArgs {
    limit: Option<i64>,
}

/// Highly rated, widely reviewed products.
pub struct GetTrendingProducts {
    store: Arc<dyn CatalogStore>,
}

impl GetTrendingProducts {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetTrendingProducts {
    fn name(&self) -> &str {
        "getTrendingProducts"
    }

    fn description(&self) -> &str {
        "Finds the most popular products: rated above 4.5 stars with more than 500 reviews, \
         best rated first. Use it for 'what's popular', 'trending', 'best sellers', or \
         'top rated' requests."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "limit": {
                    "type": "integer",
                    "description": "Number of products to return (default 10)"
                }
            },
            "additionalProperties": false
        })
    }

    async fn invoke(&self, args: Value) -> Result<Value, SparkError> {
        let args: LimitArgs = parse_args(self.name(), args)?;
        let limit = clamp_limit(args.limit, 10);
        let docs = self
            .store
            .scan_products(None)
            .await
            .map_err(|e| store_failure(self.name(), "Failed to get trending products.", e))?;

        let mut trending: Vec<&Value> = docs
            .iter()
            .filter(|doc| {
                field_f64(doc, "rating").is_some_and(|r| r > TRENDING_MIN_RATING)
                    && field_u64(doc, "review_count").is_some_and(|n| n > TRENDING_MIN_REVIEWS)
            })
            .collect();
        trending.sort_by(|a, b| trending_order(a, b));

        summaries(trending.into_iter().take(limit))
    }
}

/// Registers all five catalog lookups.
pub fn register_catalog_tools(
    registry: &mut spark_skill::ToolRegistry,
    store: Arc<dyn CatalogStore>,
) -> Result<(), SparkError> {
    registry.register(Arc::new(FindProducts::new(store.clone())))?;
    registry.register(Arc::new(GetProductDetails::new(store.clone())))?;
    registry.register(Arc::new(GetProductReviews::new(store.clone())))?;
    registry.register(Arc::new(GetProductsByCategory::new(store.clone())))?;
    registry.register(Arc::new(GetTrendingProducts::new(store)))?;
    Ok(())
}
