//! Application state shared across handlers.

use crate::catalog::Catalog;
use bazaar_core::config::AppConfig;
use bazaar_store::ShopStore;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Shop datastore.
    pub store: Arc<dyn ShopStore>,
    /// In-memory product catalog snapshot.
    pub catalog: Arc<Catalog>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(config: AppConfig, store: Arc<dyn ShopStore>, catalog: Arc<Catalog>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            catalog,
        }
    }
}
