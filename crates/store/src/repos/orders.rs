//! Order-history read model.
//!
//! There is no separate order entity: an order is a cart whose status is
//! `ordered`. This repo only aggregates those rows for display.

use crate::error::StoreResult;
use crate::models::OrderSummaryRow;
use async_trait::async_trait;
use uuid::Uuid;

/// Read-only repository over ordered carts.
#[async_trait]
pub trait OrderRepo: Send + Sync {
    /// List a user's orders, most recently updated first. Each row sums the
    /// cart's quantities and its subtotal (snapshot price, falling back to
    /// the catalog minor-unit price, falling back to zero).
    async fn list_order_summaries(&self, user_id: Uuid) -> StoreResult<Vec<OrderSummaryRow>>;
}
