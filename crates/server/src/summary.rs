//! Cart summary projection.
//!
//! Pure read-side view of a cart for API responses. No mutation: prices are
//! resolved from the item's snapshot when present, else from the catalog's
//! current price. Lines with no resolvable price count toward the total
//! quantity but not the subtotal.

use bazaar_core::price;
use bazaar_store::models::{CartItemRow, CartRow, ProductRow};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Product details embedded in a summary line.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    pub id: String,
    pub name: Option<String>,
    pub category: Option<String>,
    pub color: Option<String>,
    pub image_key: Option<String>,
    pub has_image: bool,
}

/// One summarized cart line.
#[derive(Debug, Clone, Serialize)]
pub struct CartItemView {
    pub id: Uuid,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: Option<i64>,
    pub line_total_cents: Option<i64>,
    pub product: ProductView,
}

/// Summarized cart.
#[derive(Debug, Clone, Serialize)]
pub struct CartSummary {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub status: String,
    pub items: Vec<CartItemView>,
    pub total_quantity: i64,
    pub subtotal_cents: i64,
}

/// Project a cart and its items into the response shape.
pub fn summarize(
    cart: &CartRow,
    items: &[CartItemRow],
    products: &HashMap<String, ProductRow>,
) -> CartSummary {
    let mut views = Vec::with_capacity(items.len());
    let mut subtotal_cents = 0i64;
    let mut total_quantity = 0i64;

    for item in items {
        let product = products.get(&item.product_id);

        let unit_price_cents = item
            .unit_price_cents
            .or_else(|| product.and_then(|p| price::resolve_cents(p.price_cents, p.price)));
        let line_total_cents = price::line_total_cents(unit_price_cents, item.quantity);

        total_quantity += item.quantity;
        if let Some(cents) = line_total_cents {
            subtotal_cents += cents;
        }

        views.push(CartItemView {
            id: item.id,
            product_id: item.product_id.clone(),
            quantity: item.quantity,
            unit_price_cents,
            line_total_cents,
            product: ProductView {
                id: item.product_id.clone(),
                name: product.map(|p| p.name.clone()),
                category: product.and_then(|p| p.category.clone()),
                color: product.and_then(|p| p.color.clone()),
                image_key: product.and_then(|p| p.image_key.clone()),
                has_image: product.is_some_and(|p| p.has_image),
            },
        });
    }

    CartSummary {
        id: cart.id,
        user_id: cart.user_id,
        status: cart.status.clone(),
        items: views,
        total_quantity,
        subtotal_cents,
    }
}
