//! Cart endpoints.
//!
//! Every handler here resolves the request to its single active cart first;
//! the mutation then only ever targets that cart, which is what scopes item
//! ids and keeps ordered carts immutable.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::auth::{self, CurrentUser};
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{Reissue, load_summary, resolve_request_cart};
use crate::state::AppState;
use crate::summary::CartSummary;

/// Request payload for adding an item.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

/// Request payload for setting an item quantity.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

/// Response payload for checkout.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_id: Uuid,
    pub order_total_quantity: i64,
    pub order_subtotal_cents: i64,
    /// The fresh active cart the client now points at.
    pub cart: CartSummary,
}

fn validate_quantity(quantity: i64) -> ApiResult<()> {
    if quantity < 1 {
        return Err(ApiError::BadRequest("quantity must be >= 1".to_string()));
    }
    Ok(())
}

/// GET /cart - resolve and summarize the active cart.
pub async fn get_cart(
    State(state): State<AppState>,
    cookies: Cookies,
    user: Option<Extension<CurrentUser>>,
) -> ApiResult<Json<CartSummary>> {
    let (cart, _) = resolve_request_cart(&state, &cookies, user.as_deref(), Reissue::Always).await?;
    Ok(Json(load_summary(&state, &cart).await?))
}

/// POST /cart/items - add quantity of a product to the active cart.
pub async fn add_cart_item(
    State(state): State<AppState>,
    cookies: Cookies,
    user: Option<Extension<CurrentUser>>,
    Json(payload): Json<AddItemRequest>,
) -> ApiResult<Json<CartSummary>> {
    validate_quantity(payload.quantity)?;

    let (cart, _) = resolve_request_cart(&state, &cookies, user.as_deref(), Reissue::Always).await?;
    state
        .store
        .add_item(
            cart.id,
            &payload.product_id,
            payload.quantity,
            true,
            OffsetDateTime::now_utc(),
        )
        .await?;

    Ok(Json(load_summary(&state, &cart).await?))
}

/// PATCH /cart/items/{item_id} - set an item's quantity (absolute).
pub async fn update_cart_item(
    State(state): State<AppState>,
    cookies: Cookies,
    user: Option<Extension<CurrentUser>>,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> ApiResult<Json<CartSummary>> {
    validate_quantity(payload.quantity)?;

    let (cart, _) =
        resolve_request_cart(&state, &cookies, user.as_deref(), Reissue::IfCreated).await?;
    state
        .store
        .set_item_quantity(cart.id, item_id, payload.quantity, OffsetDateTime::now_utc())
        .await?;

    Ok(Json(load_summary(&state, &cart).await?))
}

/// DELETE /cart/items/{item_id} - remove an item from the active cart.
pub async fn remove_cart_item(
    State(state): State<AppState>,
    cookies: Cookies,
    user: Option<Extension<CurrentUser>>,
    Path(item_id): Path<Uuid>,
) -> ApiResult<Json<CartSummary>> {
    let (cart, _) =
        resolve_request_cart(&state, &cookies, user.as_deref(), Reissue::IfCreated).await?;
    state.store.remove_item(cart.id, item_id).await?;

    Ok(Json(load_summary(&state, &cart).await?))
}

/// POST /cart/clear - drop every item in the active cart. Idempotent.
pub async fn clear_cart(
    State(state): State<AppState>,
    cookies: Cookies,
    user: Option<Extension<CurrentUser>>,
) -> ApiResult<Json<CartSummary>> {
    let (cart, _) =
        resolve_request_cart(&state, &cookies, user.as_deref(), Reissue::IfCreated).await?;
    state.store.clear_items(cart.id).await?;

    Ok(Json(load_summary(&state, &cart).await?))
}

/// POST /cart/checkout - order the active cart and start a fresh one.
pub async fn checkout(
    State(state): State<AppState>,
    cookies: Cookies,
    user: Option<Extension<CurrentUser>>,
) -> ApiResult<Json<CheckoutResponse>> {
    let (cart, _) =
        resolve_request_cart(&state, &cookies, user.as_deref(), Reissue::IfCreated).await?;

    let (ordered, fresh) = state
        .store
        .checkout_cart(cart.id, OffsetDateTime::now_utc())
        .await?;

    // Redirect the client's cart identity to the replacement cart.
    auth::issue_cart_cookie(&cookies, fresh.id, state.config.server.cookie_secure);

    let order = load_summary(&state, &ordered).await?;
    let cart = load_summary(&state, &fresh).await?;

    Ok(Json(CheckoutResponse {
        order_id: ordered.id,
        order_total_quantity: order.total_quantity,
        order_subtotal_cents: order.subtotal_cents,
        cart,
    }))
}
