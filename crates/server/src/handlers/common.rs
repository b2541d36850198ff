//! Shared handler helpers.

use crate::auth::{self, CurrentUser};
use crate::error::ApiResult;
use crate::state::AppState;
use crate::summary::{self, CartSummary};
use bazaar_store::models::CartRow;
use time::OffsetDateTime;
use tower_cookies::Cookies;

/// Cart-cookie reissue policy per endpoint.
#[derive(Clone, Copy, Debug)]
pub enum Reissue {
    /// Reissue on every successful resolution. Self-heals stale cookies,
    /// e.g. after an ownership claim moved the cart under a user.
    Always,
    /// Reissue only when resolution had to create a new cart.
    IfCreated,
}

/// Resolve the request's active cart and apply the cookie reissue policy.
pub async fn resolve_request_cart(
    state: &AppState,
    cookies: &Cookies,
    user: Option<&CurrentUser>,
    reissue: Reissue,
) -> ApiResult<(CartRow, bool)> {
    let owner = user.map(|u| u.user.id);
    let token = auth::cart_token(cookies);
    let (cart, created) = state
        .store
        .resolve_active_cart(owner, token, OffsetDateTime::now_utc())
        .await?;

    if created || matches!(reissue, Reissue::Always) {
        auth::issue_cart_cookie(cookies, cart.id, state.config.server.cookie_secure);
    }
    Ok((cart, created))
}

/// Load a cart's summary with items and product details freshly fetched.
pub async fn load_summary(state: &AppState, cart: &CartRow) -> ApiResult<CartSummary> {
    let items = state.store.list_items(cart.id).await?;
    let product_ids: Vec<String> = items.iter().map(|i| i.product_id.clone()).collect();
    let products = state.store.get_products_batch(&product_ids).await?;
    Ok(summary::summarize(cart, &items, &products))
}
