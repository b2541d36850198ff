//! Order-history endpoints.

use axum::extract::State;
use axum::{Extension, Json};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::auth::{CurrentUser, require_user};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// One order in the history listing.
#[derive(Debug, Serialize)]
pub struct OrderView {
    pub order_id: Uuid,
    pub ordered_at: String,
    pub quantity_purchased: i64,
    pub subtotal_cents: i64,
}

/// Response for the order-history listing.
#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    pub orders: Vec<OrderView>,
}

/// GET /orders - the caller's order history, newest first. Guest access is
/// not allowed here: orders only exist for signed-in users.
pub async fn list_orders(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> ApiResult<Json<OrdersResponse>> {
    let current = require_user(user.as_deref())?;

    let rows = state.store.list_order_summaries(current.user.id).await?;
    let orders = rows
        .into_iter()
        .map(|row| {
            Ok(OrderView {
                order_id: row.order_id,
                ordered_at: row.ordered_at.format(&Rfc3339).map_err(|e| {
                    ApiError::Internal(format!("failed to format ordered_at: {e}"))
                })?,
                quantity_purchased: row.quantity_purchased,
                subtotal_cents: row.subtotal_cents,
            })
        })
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(Json(OrdersResponse { orders }))
}
