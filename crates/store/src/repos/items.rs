//! Cart item repository.

use crate::error::StoreResult;
use crate::models::CartItemRow;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Repository for cart line items.
#[async_trait]
pub trait ItemRepo: Send + Sync {
    /// Add quantity of a product to a cart.
    ///
    /// Upserts on (cart_id, product_id): an existing row has the quantity
    /// added on, a missing row is inserted. The upsert is a single atomic
    /// statement, so two racing first-adds for the same pair can never
    /// produce two rows and neither caller observes the race. When
    /// `snapshot_price` is set, the unit price is captured from the catalog
    /// on first insert and never overwritten afterwards.
    ///
    /// Fails with `NotFound` when the cart is missing or not active, or the
    /// product does not exist.
    async fn add_item(
        &self,
        cart_id: Uuid,
        product_id: &str,
        quantity: i64,
        snapshot_price: bool,
        now: OffsetDateTime,
    ) -> StoreResult<()>;

    /// Set an item's quantity (absolute, not additive).
    ///
    /// The item is scoped by cart: an item id under a different cart is
    /// `NotFound`.
    async fn set_item_quantity(
        &self,
        cart_id: Uuid,
        item_id: Uuid,
        quantity: i64,
        now: OffsetDateTime,
    ) -> StoreResult<()>;

    /// Remove an item, scoped by cart. Fails with `NotFound` when no such
    /// item exists under the cart.
    async fn remove_item(&self, cart_id: Uuid, item_id: Uuid) -> StoreResult<()>;

    /// Delete all items under a cart. Idempotent.
    async fn clear_items(&self, cart_id: Uuid) -> StoreResult<()>;

    /// List a cart's items, oldest first.
    async fn list_items(&self, cart_id: Uuid) -> StoreResult<Vec<CartItemRow>>;
}
