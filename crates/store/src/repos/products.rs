//! Product repository.

use crate::error::StoreResult;
use crate::models::ProductRow;
use async_trait::async_trait;
use std::collections::HashMap;

/// Repository for catalog products.
#[async_trait]
pub trait ProductRepo: Send + Sync {
    /// Insert products, skipping ids that already exist. Returns the number
    /// of rows actually inserted. Used for seeding.
    async fn insert_products(&self, products: &[ProductRow]) -> StoreResult<u64>;

    /// Get a product by ID.
    async fn get_product(&self, product_id: &str) -> StoreResult<Option<ProductRow>>;

    /// Get a batch of products keyed by ID.
    async fn get_products_batch(
        &self,
        product_ids: &[String],
    ) -> StoreResult<HashMap<String, ProductRow>>;

    /// List all products.
    async fn list_products(&self) -> StoreResult<Vec<ProductRow>>;

    /// Count products.
    async fn count_products(&self) -> StoreResult<u64>;
}
