//! Database models mapping to the shop schema.

use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Cart lifecycle states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CartStatus {
    /// The single mutable cart an owner is currently building.
    Active,
    /// Checked out; immutable, queryable as order history.
    Ordered,
    /// Absorbed into another cart at login; terminal.
    Merged,
    /// Reserved; not produced by any current flow.
    Abandoned,
}

impl CartStatus {
    /// Get the string representation stored in the `status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Ordered => "ordered",
            Self::Merged => "merged",
            Self::Abandoned => "abandoned",
        }
    }
}

impl std::fmt::Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User record.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Authentication session record. Only the token hash is stored.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

/// Cart record. A null `user_id` marks a guest cart.
#[derive(Debug, Clone, FromRow)]
pub struct CartRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub status: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl CartRow {
    /// Build a fresh active cart for the given (nullable) owner.
    pub fn new_active(user_id: Option<Uuid>, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            status: CartStatus::Active.as_str().to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this cart is still mutable.
    pub fn is_active(&self) -> bool {
        self.status == CartStatus::Active.as_str()
    }
}

/// Cart line item. At most one row per (cart, product) pair.
#[derive(Debug, Clone, FromRow)]
pub struct CartItemRow {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: String,
    pub quantity: i64,
    /// Price captured at first add; never overwritten afterwards.
    pub unit_price_cents: Option<i64>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Catalog product record. Read-mostly; never mutated by cart operations.
#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    /// Audience label (Menswear / Ladieswear / Divided).
    pub index_group: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
    /// Major-unit price; legacy field, converted on use.
    pub price: Option<f64>,
    /// Minor-unit price; preferred when present.
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    pub image_key: Option<String>,
    pub has_image: bool,
}

/// Aggregated order-history row (one per ordered cart).
#[derive(Debug, Clone, FromRow)]
pub struct OrderSummaryRow {
    pub order_id: Uuid,
    pub ordered_at: OffsetDateTime,
    pub quantity_purchased: i64,
    pub subtotal_cents: i64,
}
