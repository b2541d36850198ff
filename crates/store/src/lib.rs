//! Datastore abstraction and implementation for the Bazaar shop backend.
//!
//! This crate provides the persistence plane:
//! - Users and authentication sessions (hashed tokens)
//! - Carts and their lifecycle (active / ordered / merged)
//! - Cart line items with race-safe upsert semantics
//! - The read-mostly product catalog
//! - The order-history read model over ordered carts

pub mod error;
pub mod models;
pub mod repos;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use store::{ShopStore, SqliteStore};

use bazaar_core::config::DbConfig;
use std::sync::Arc;

/// Create a datastore from configuration.
pub async fn from_config(config: &DbConfig) -> StoreResult<Arc<dyn ShopStore>> {
    let store = SqliteStore::new(&config.path, Some(config.busy_timeout_secs)).await?;
    Ok(Arc::new(store) as Arc<dyn ShopStore>)
}
