//! Cart repository.
//!
//! Besides plain row access, this trait carries the multi-step cart
//! primitives that must run against a single connection: active-cart
//! resolution (including the guest-cart claim), the login-time guest merge,
//! and the checkout transition. Each of those either fully commits or leaves
//! persisted state untouched.

use crate::error::StoreResult;
use crate::models::CartRow;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Repository for cart operations.
#[async_trait]
pub trait CartRepo: Send + Sync {
    /// Get a cart by ID, in any status.
    async fn get_cart(&self, cart_id: Uuid) -> StoreResult<Option<CartRow>>;

    /// Get a user's active cart, if any.
    async fn get_active_cart_for_user(&self, user_id: Uuid) -> StoreResult<Option<CartRow>>;

    /// Insert a cart row.
    async fn create_cart(&self, cart: &CartRow) -> StoreResult<()>;

    /// Resolve the single active cart for a request.
    ///
    /// Returns the cart plus a `created` flag callers use to decide whether
    /// the cart identity cookie must be reissued. Resolution order: the
    /// owner's existing active cart, then a claimable unowned active cart
    /// named by `cart_token`, then a fresh cart. For anonymous requests the
    /// token either points at an active unowned cart or a fresh guest cart
    /// is created.
    async fn resolve_active_cart(
        &self,
        owner: Option<Uuid>,
        cart_token: Option<Uuid>,
        now: OffsetDateTime,
    ) -> StoreResult<(CartRow, bool)>;

    /// Fold a guest cart into a user's cart after login or registration.
    ///
    /// A missing, non-active or already-owned guest cart is a no-op; the
    /// user's current active cart (if any) is returned. Otherwise the guest
    /// cart is either reassigned to the user wholesale, or its items are
    /// merged into the user's existing active cart (quantities summed per
    /// product) and the guest cart ends up `merged`. Runs in one
    /// transaction.
    async fn merge_guest_cart(
        &self,
        guest_cart_id: Uuid,
        user_id: Uuid,
        now: OffsetDateTime,
    ) -> StoreResult<Option<CartRow>>;

    /// Transition an active cart to `ordered` and create its replacement.
    ///
    /// Fails with `EmptyCart` when the cart has no items and `NotFound` when
    /// it does not exist or is not active. Both the status flip and the
    /// insert of the new active cart (same nullable owner) commit together
    /// or not at all. Returns `(ordered_cart, new_active_cart)`.
    async fn checkout_cart(
        &self,
        cart_id: Uuid,
        now: OffsetDateTime,
    ) -> StoreResult<(CartRow, CartRow)>;
}
