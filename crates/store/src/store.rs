//! Shop datastore trait and SQLite implementation.

use crate::error::{StoreError, StoreResult};
use crate::models::{
    CartItemRow, CartRow, CartStatus, OrderSummaryRow, ProductRow, SessionRow, UserRow,
};
use crate::repos::{CartRepo, ItemRepo, OrderRepo, ProductRepo, SessionRepo, UserRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined shop datastore trait.
#[async_trait]
pub trait ShopStore:
    UserRepo + SessionRepo + CartRepo + ItemRepo + ProductRepo + OrderRepo + Send + Sync
{
    /// Create the schema if it does not exist yet.
    async fn migrate(&self) -> StoreResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> StoreResult<()>;
}

/// SQLite-based shop datastore.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Create a new SQLite store.
    pub async fn new(
        path: impl AsRef<Path>,
        busy_timeout_secs: Option<u64>,
    ) -> StoreResult<Self> {
        let path = path.as_ref();
        let busy_timeout_secs = busy_timeout_secs.unwrap_or(5);

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Config(format!("cannot create {}: {e}", parent.display())))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(busy_timeout_secs));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection keeps
            // every request's statements serialized and avoids persistent
            // "database is locked" failures under axum concurrency.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

/// Whether an sqlx error is a uniqueness-constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[async_trait]
impl ShopStore for SqliteStore {
    async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl UserRepo for SqliteStore {
    async fn create_user(&self, user: &UserRow) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id, email, name, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::AlreadyExists(format!("email '{}' already registered", user.email))
            } else {
                e.into()
            }
        })?;
        Ok(())
    }

    async fn get_user(&self, user_id: uuid::Uuid) -> StoreResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}

#[async_trait]
impl SessionRepo for SqliteStore {
    async fn create_session(&self, session: &SessionRow) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO sessions (id, user_id, token_hash, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.token_hash)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_session_by_hash(&self, token_hash: &str) -> StoreResult<Option<SessionRow>> {
        let row = sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE token_hash = ?")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete_session(&self, session_id: uuid::Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CartRepo for SqliteStore {
    async fn get_cart(&self, cart_id: uuid::Uuid) -> StoreResult<Option<CartRow>> {
        let row = sqlx::query_as::<_, CartRow>("SELECT * FROM carts WHERE id = ?")
            .bind(cart_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_active_cart_for_user(&self, user_id: uuid::Uuid) -> StoreResult<Option<CartRow>> {
        let row = sqlx::query_as::<_, CartRow>(
            "SELECT * FROM carts WHERE user_id = ? AND status = 'active'",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn create_cart(&self, cart: &CartRow) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO carts (id, user_id, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(cart.id)
        .bind(cart.user_id)
        .bind(&cart.status)
        .bind(cart.created_at)
        .bind(cart.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Constraint("owner already has an active cart".to_string())
            } else {
                e.into()
            }
        })?;
        Ok(())
    }

    async fn resolve_active_cart(
        &self,
        owner: Option<uuid::Uuid>,
        cart_token: Option<uuid::Uuid>,
        now: time::OffsetDateTime,
    ) -> StoreResult<(CartRow, bool)> {
        if let Some(user_id) = owner {
            // 1) The owner's existing active cart wins outright.
            if let Some(cart) = self.get_active_cart_for_user(user_id).await? {
                return Ok((cart, false));
            }

            // 2) Claim the guest cart the client is holding, if it is still
            //    active and unowned. The conditional UPDATE makes the claim
            //    atomic: a cart that was ordered or claimed in the meantime
            //    simply matches zero rows.
            if let Some(token) = cart_token {
                let claimed = sqlx::query(
                    "UPDATE carts SET user_id = ?, updated_at = ? \
                     WHERE id = ? AND status = 'active' AND user_id IS NULL",
                )
                .bind(user_id)
                .bind(now)
                .bind(token)
                .execute(&self.pool)
                .await;

                // A concurrent request may have given the user an active
                // cart since the lookup above; the one-active-per-owner
                // index rejects the claim then and step 3 re-reads the
                // winner.
                let claimed = match claimed {
                    Ok(result) => result.rows_affected(),
                    Err(e) if is_unique_violation(&e) => 0,
                    Err(e) => return Err(e.into()),
                };

                if claimed > 0 {
                    let cart = self.get_cart(token).await?.ok_or_else(|| {
                        StoreError::Internal(format!("claimed cart {token} vanished"))
                    })?;
                    tracing::debug!(cart_id = %token, user_id = %user_id, "guest cart claimed");
                    return Ok((cart, false));
                }
            }

            // 3) Fresh cart for the user. A concurrent request may win the
            //    one-active-cart-per-owner index; recover by re-reading the
            //    winner instead of surfacing the violation.
            let cart = CartRow::new_active(Some(user_id), now);
            return match self.create_cart(&cart).await {
                Ok(()) => Ok((cart, true)),
                Err(StoreError::Constraint(_)) => {
                    let existing = self.get_active_cart_for_user(user_id).await?.ok_or_else(
                        || StoreError::Internal("active cart vanished after insert conflict".into()),
                    )?;
                    Ok((existing, false))
                }
                Err(e) => Err(e),
            };
        }

        // 4) Anonymous flow: reuse the cart the cookie names, but only while
        //    it is active and unowned. Anything else (ordered, merged,
        //    claimed, unknown id) means the cookie is stale: start fresh.
        if let Some(token) = cart_token {
            if let Some(cart) = self.get_cart(token).await? {
                if cart.is_active() && cart.user_id.is_none() {
                    return Ok((cart, false));
                }
            }
        }

        let cart = CartRow::new_active(None, now);
        self.create_cart(&cart).await?;
        Ok((cart, true))
    }

    async fn merge_guest_cart(
        &self,
        guest_cart_id: uuid::Uuid,
        user_id: uuid::Uuid,
        now: time::OffsetDateTime,
    ) -> StoreResult<Option<CartRow>> {
        let mut tx = self.pool.begin().await?;

        let guest = sqlx::query_as::<_, CartRow>("SELECT * FROM carts WHERE id = ?")
            .bind(guest_cart_id)
            .fetch_optional(&mut *tx)
            .await?;

        let attachable =
            matches!(&guest, Some(cart) if cart.is_active() && cart.user_id.is_none());

        let user_cart = sqlx::query_as::<_, CartRow>(
            "SELECT * FROM carts WHERE user_id = ? AND status = 'active'",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        if !attachable {
            // Nothing to fold in; whatever active cart the user already has
            // is the answer.
            tx.commit().await?;
            return Ok(user_cart);
        }

        let mut guest = guest.ok_or_else(|| {
            StoreError::Internal(format!("guest cart {guest_cart_id} vanished mid-merge"))
        })?;

        let Some(user_cart) = user_cart else {
            // Cheapest path: hand the whole guest cart to the user.
            sqlx::query("UPDATE carts SET user_id = ?, updated_at = ? WHERE id = ?")
                .bind(user_id)
                .bind(now)
                .bind(guest.id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            guest.user_id = Some(user_id);
            guest.updated_at = now;
            tracing::debug!(cart_id = %guest.id, user_id = %user_id, "guest cart reassigned at login");
            return Ok(Some(guest));
        };

        // The user already has a cart: fold guest items in, summing
        // quantities on overlapping products. A newly inserted row keeps the
        // guest item's price snapshot; an existing row keeps its own
        // (first non-null snapshot wins, same as add_item).
        let guest_items = sqlx::query_as::<_, CartItemRow>(
            "SELECT * FROM cart_items WHERE cart_id = ? ORDER BY created_at",
        )
        .bind(guest.id)
        .fetch_all(&mut *tx)
        .await?;

        for item in &guest_items {
            sqlx::query(
                r#"
                INSERT INTO cart_items (id, cart_id, product_id, quantity, unit_price_cents, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(cart_id, product_id) DO UPDATE SET
                    quantity = quantity + excluded.quantity,
                    unit_price_cents = COALESCE(unit_price_cents, excluded.unit_price_cents),
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(uuid::Uuid::new_v4())
            .bind(user_cart.id)
            .bind(&item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE carts SET status = ?, updated_at = ? WHERE id = ?")
            .bind(CartStatus::Merged.as_str())
            .bind(now)
            .bind(guest.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::debug!(
            guest_cart_id = %guest.id,
            user_cart_id = %user_cart.id,
            items = guest_items.len(),
            "guest cart merged into user cart"
        );
        Ok(Some(user_cart))
    }

    async fn checkout_cart(
        &self,
        cart_id: uuid::Uuid,
        now: time::OffsetDateTime,
    ) -> StoreResult<(CartRow, CartRow)> {
        // The status flip and the replacement cart commit together or not at
        // all; a failed precondition rolls back with nothing applied.
        let mut tx = self.pool.begin().await?;

        let cart = sqlx::query_as::<_, CartRow>("SELECT * FROM carts WHERE id = ?")
            .bind(cart_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("cart {cart_id} not found")))?;

        if !cart.is_active() {
            return Err(StoreError::NotFound(format!("cart {cart_id} is not active")));
        }

        let item_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cart_items WHERE cart_id = ?")
            .bind(cart_id)
            .fetch_one(&mut *tx)
            .await?;
        if item_count == 0 {
            return Err(StoreError::EmptyCart);
        }

        sqlx::query("UPDATE carts SET status = ?, updated_at = ? WHERE id = ? AND status = 'active'")
            .bind(CartStatus::Ordered.as_str())
            .bind(now)
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;

        let new_cart = CartRow::new_active(cart.user_id, now);
        sqlx::query(
            "INSERT INTO carts (id, user_id, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(new_cart.id)
        .bind(new_cart.user_id)
        .bind(&new_cart.status)
        .bind(new_cart.created_at)
        .bind(new_cart.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let ordered = CartRow {
            status: CartStatus::Ordered.as_str().to_string(),
            updated_at: now,
            ..cart
        };
        tracing::info!(order_id = %ordered.id, new_cart_id = %new_cart.id, "cart checked out");
        Ok((ordered, new_cart))
    }
}

#[async_trait]
impl ItemRepo for SqliteStore {
    async fn add_item(
        &self,
        cart_id: uuid::Uuid,
        product_id: &str,
        quantity: i64,
        snapshot_price: bool,
        now: time::OffsetDateTime,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let status: Option<String> = sqlx::query_scalar("SELECT status FROM carts WHERE id = ?")
            .bind(cart_id)
            .fetch_optional(&mut *tx)
            .await?;
        match status.as_deref() {
            None => return Err(StoreError::NotFound(format!("cart {cart_id} not found"))),
            Some("active") => {}
            Some(_) => return Err(StoreError::NotFound(format!("cart {cart_id} is not active"))),
        }

        let product: Option<(Option<i64>, Option<f64>)> =
            sqlx::query_as("SELECT price_cents, price FROM products WHERE id = ?")
                .bind(product_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((price_cents, price)) = product else {
            return Err(StoreError::NotFound(format!("product {product_id} not found")));
        };

        let unit_price_cents = if snapshot_price {
            bazaar_core::price::resolve_cents(price_cents, price)
        } else {
            None
        };

        // Atomic upsert-with-increment: racing first-adds for the same
        // (cart, product) pair collapse into one row, and the snapshot price
        // only ever moves from NULL to a value.
        sqlx::query(
            r#"
            INSERT INTO cart_items (id, cart_id, product_id, quantity, unit_price_cents, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(cart_id, product_id) DO UPDATE SET
                quantity = quantity + excluded.quantity,
                unit_price_cents = COALESCE(unit_price_cents, excluded.unit_price_cents),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(uuid::Uuid::new_v4())
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .bind(unit_price_cents)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn set_item_quantity(
        &self,
        cart_id: uuid::Uuid,
        item_id: uuid::Uuid,
        quantity: i64,
        now: time::OffsetDateTime,
    ) -> StoreResult<()> {
        // Scoping by cart id is the authorization boundary: an item id under
        // a different cart matches zero rows.
        let result = sqlx::query(
            "UPDATE cart_items SET quantity = ?, updated_at = ? WHERE id = ? AND cart_id = ?",
        )
        .bind(quantity)
        .bind(now)
        .bind(item_id)
        .bind(cart_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("cart item {item_id} not found")));
        }
        Ok(())
    }

    async fn remove_item(&self, cart_id: uuid::Uuid, item_id: uuid::Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = ? AND cart_id = ?")
            .bind(item_id)
            .bind(cart_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("cart item {item_id} not found")));
        }
        Ok(())
    }

    async fn clear_items(&self, cart_id: uuid::Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = ?")
            .bind(cart_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_items(&self, cart_id: uuid::Uuid) -> StoreResult<Vec<CartItemRow>> {
        let rows = sqlx::query_as::<_, CartItemRow>(
            "SELECT * FROM cart_items WHERE cart_id = ? ORDER BY created_at",
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl ProductRepo for SqliteStore {
    async fn insert_products(&self, products: &[ProductRow]) -> StoreResult<u64> {
        if products.is_empty() {
            return Ok(0);
        }

        // One transaction for the whole batch - a malformed row aborts the seed.
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;

        for product in products {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO products
                    (id, name, category, index_group, color, description, price, price_cents, currency, image_key, has_image)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&product.id)
            .bind(&product.name)
            .bind(&product.category)
            .bind(&product.index_group)
            .bind(&product.color)
            .bind(&product.description)
            .bind(product.price)
            .bind(product.price_cents)
            .bind(&product.currency)
            .bind(&product.image_key)
            .bind(product.has_image)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn get_product(&self, product_id: &str) -> StoreResult<Option<ProductRow>> {
        let row = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = ?")
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_products_batch(
        &self,
        product_ids: &[String],
    ) -> StoreResult<std::collections::HashMap<String, ProductRow>> {
        use std::collections::HashMap;

        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        // SQLite has a limit of ~999 parameters, so batch if needed.
        const BATCH_SIZE: usize = 900;
        let mut result = HashMap::with_capacity(product_ids.len());

        for batch in product_ids.chunks(BATCH_SIZE) {
            let placeholders: Vec<&str> = batch.iter().map(|_| "?").collect();
            let query = format!(
                "SELECT * FROM products WHERE id IN ({})",
                placeholders.join(", ")
            );

            let mut query_builder = sqlx::query_as::<_, ProductRow>(&query);
            for id in batch {
                query_builder = query_builder.bind(id);
            }

            let rows: Vec<ProductRow> = query_builder.fetch_all(&self.pool).await?;
            for row in rows {
                result.insert(row.id.clone(), row);
            }
        }

        Ok(result)
    }

    async fn list_products(&self) -> StoreResult<Vec<ProductRow>> {
        let rows = sqlx::query_as::<_, ProductRow>("SELECT * FROM products ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn count_products(&self) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

#[async_trait]
impl OrderRepo for SqliteStore {
    async fn list_order_summaries(
        &self,
        user_id: uuid::Uuid,
    ) -> StoreResult<Vec<OrderSummaryRow>> {
        let rows = sqlx::query_as::<_, OrderSummaryRow>(
            r#"
            SELECT c.id AS order_id,
                   c.updated_at AS ordered_at,
                   COALESCE(SUM(ci.quantity), 0) AS quantity_purchased,
                   COALESCE(SUM(ci.quantity * COALESCE(ci.unit_price_cents, p.price_cents, 0)), 0) AS subtotal_cents
            FROM carts c
            JOIN cart_items ci ON ci.cart_id = c.id
            JOIN products p ON p.id = ci.product_id
            WHERE c.user_id = ? AND c.status = 'ordered'
            GROUP BY c.id, c.updated_at
            ORDER BY c.updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// Schema for the shop datastore.
///
/// The two uniqueness constraints here carry the cart subsystem's
/// correctness: one active cart per non-null owner, and one line item per
/// (cart, product) pair. Everything else is plain bookkeeping.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id BLOB PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    name TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    id BLOB PRIMARY KEY,
    user_id BLOB NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    token_hash TEXT NOT NULL UNIQUE,
    expires_at TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);

CREATE TABLE IF NOT EXISTS products (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    category TEXT,
    index_group TEXT,
    color TEXT,
    description TEXT,
    price REAL,
    price_cents INTEGER,
    currency TEXT,
    image_key TEXT,
    has_image INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS carts (
    id BLOB PRIMARY KEY,
    user_id BLOB REFERENCES users(id) ON DELETE SET NULL,
    status TEXT NOT NULL DEFAULT 'active'
        CHECK (status IN ('active', 'ordered', 'merged', 'abandoned')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS ux_carts_one_active_per_user
    ON carts(user_id) WHERE user_id IS NOT NULL AND status = 'active';
CREATE INDEX IF NOT EXISTS idx_carts_user ON carts(user_id);

CREATE TABLE IF NOT EXISTS cart_items (
    id BLOB PRIMARY KEY,
    cart_id BLOB NOT NULL REFERENCES carts(id) ON DELETE CASCADE,
    product_id TEXT NOT NULL REFERENCES products(id),
    quantity INTEGER NOT NULL CHECK (quantity >= 1),
    unit_price_cents INTEGER CHECK (unit_price_cents IS NULL OR unit_price_cents >= 0),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (cart_id, product_id)
);
CREATE INDEX IF NOT EXISTS idx_cart_items_cart ON cart_items(cart_id);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    async fn test_store() -> (tempfile::TempDir, SqliteStore) {
        let temp = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(temp.path().join("shop.db"), None)
            .await
            .unwrap();
        (temp, store)
    }

    fn now() -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    async fn seed_user(store: &SqliteStore, email: &str) -> UserRow {
        let user = UserRow {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: None,
            created_at: now(),
            updated_at: now(),
        };
        store.create_user(&user).await.unwrap();
        user
    }

    async fn seed_product(store: &SqliteStore, id: &str, price_cents: Option<i64>) {
        let product = ProductRow {
            id: id.to_string(),
            name: format!("product {id}"),
            category: None,
            index_group: None,
            color: None,
            description: None,
            price: None,
            price_cents,
            currency: None,
            image_key: None,
            has_image: false,
        };
        store.insert_products(std::slice::from_ref(&product)).await.unwrap();
    }

    async fn cart_count_for_user(store: &SqliteStore, user_id: Uuid) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM carts WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(store.pool())
            .await
            .unwrap()
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    #[tokio::test]
    async fn resolve_creates_and_reuses_guest_cart() {
        let (_temp, store) = test_store().await;

        let (cart, created) = store.resolve_active_cart(None, None, now()).await.unwrap();
        assert!(created);
        assert!(cart.user_id.is_none());
        assert!(cart.is_active());

        let (again, created) = store
            .resolve_active_cart(None, Some(cart.id), now())
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(again.id, cart.id);
    }

    #[tokio::test]
    async fn resolve_treats_stale_guest_token_as_missing() {
        let (_temp, store) = test_store().await;

        // Unknown id
        let (cart, created) = store
            .resolve_active_cart(None, Some(Uuid::new_v4()), now())
            .await
            .unwrap();
        assert!(created);

        // Ordered cart behind the cookie
        seed_product(&store, "p1", Some(100)).await;
        store.add_item(cart.id, "p1", 1, true, now()).await.unwrap();
        let (ordered, _) = store.checkout_cart(cart.id, now()).await.unwrap();

        let (fresh, created) = store
            .resolve_active_cart(None, Some(ordered.id), now())
            .await
            .unwrap();
        assert!(created);
        assert_ne!(fresh.id, ordered.id);
    }

    #[tokio::test]
    async fn resolve_prefers_users_existing_active_cart() {
        let (_temp, store) = test_store().await;
        let user = seed_user(&store, "a@example.com").await;

        let (first, created) = store
            .resolve_active_cart(Some(user.id), None, now())
            .await
            .unwrap();
        assert!(created);

        // Even with a claimable guest cart in the cookie, the user's own
        // active cart wins.
        let (guest, _) = store.resolve_active_cart(None, None, now()).await.unwrap();
        let (resolved, created) = store
            .resolve_active_cart(Some(user.id), Some(guest.id), now())
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(resolved.id, first.id);
    }

    #[tokio::test]
    async fn resolve_claims_unowned_active_cart() {
        let (_temp, store) = test_store().await;
        let user = seed_user(&store, "a@example.com").await;

        let (guest, _) = store.resolve_active_cart(None, None, now()).await.unwrap();
        let (claimed, created) = store
            .resolve_active_cart(Some(user.id), Some(guest.id), now())
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(claimed.id, guest.id);
        assert_eq!(claimed.user_id, Some(user.id));

        // Resolving again keeps returning the same cart.
        let (again, created) = store
            .resolve_active_cart(Some(user.id), None, now())
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(again.id, guest.id);
    }

    #[tokio::test]
    async fn resolve_never_yields_two_active_carts_per_user() {
        let (_temp, store) = test_store().await;
        let user = seed_user(&store, "a@example.com").await;

        let (a, b) = tokio::join!(
            store.resolve_active_cart(Some(user.id), None, now()),
            store.resolve_active_cart(Some(user.id), None, now()),
        );
        let (cart_a, _) = a.unwrap();
        let (cart_b, _) = b.unwrap();
        assert_eq!(cart_a.id, cart_b.id);
        assert_eq!(cart_count_for_user(&store, user.id).await, 1);
    }

    // =========================================================================
    // Item mutation
    // =========================================================================

    #[tokio::test]
    async fn add_item_accumulates_into_a_single_row() {
        let (_temp, store) = test_store().await;
        seed_product(&store, "p1", Some(1500)).await;
        let (cart, _) = store.resolve_active_cart(None, None, now()).await.unwrap();

        store.add_item(cart.id, "p1", 2, true, now()).await.unwrap();
        store.add_item(cart.id, "p1", 3, true, now()).await.unwrap();

        let items = store.list_items(cart.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 5);
        assert_eq!(items[0].unit_price_cents, Some(1500));
    }

    #[tokio::test]
    async fn concurrent_adds_sum_without_duplicate_rows() {
        let (_temp, store) = test_store().await;
        seed_product(&store, "p1", Some(100)).await;
        let (cart, _) = store.resolve_active_cart(None, None, now()).await.unwrap();

        let (a, b) = tokio::join!(
            store.add_item(cart.id, "p1", 2, true, now()),
            store.add_item(cart.id, "p1", 3, true, now()),
        );
        a.unwrap();
        b.unwrap();

        let items = store.list_items(cart.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 5);
    }

    #[tokio::test]
    async fn add_item_rejects_unknown_cart_product_and_inactive_cart() {
        let (_temp, store) = test_store().await;
        seed_product(&store, "p1", Some(100)).await;

        let missing = store.add_item(Uuid::new_v4(), "p1", 1, true, now()).await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));

        let (cart, _) = store.resolve_active_cart(None, None, now()).await.unwrap();
        let unknown = store.add_item(cart.id, "nope", 1, true, now()).await;
        assert!(matches!(unknown, Err(StoreError::NotFound(_))));

        store.add_item(cart.id, "p1", 1, true, now()).await.unwrap();
        let (ordered, _) = store.checkout_cart(cart.id, now()).await.unwrap();
        let inactive = store.add_item(ordered.id, "p1", 1, true, now()).await;
        assert!(matches!(inactive, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn snapshot_price_is_set_once_and_kept() {
        let (_temp, store) = test_store().await;
        seed_product(&store, "p1", Some(1000)).await;
        let (cart, _) = store.resolve_active_cart(None, None, now()).await.unwrap();

        store.add_item(cart.id, "p1", 1, true, now()).await.unwrap();

        // A later catalog price change must not move the snapshot.
        sqlx::query("UPDATE products SET price_cents = 2000 WHERE id = 'p1'")
            .execute(store.pool())
            .await
            .unwrap();
        store.add_item(cart.id, "p1", 1, true, now()).await.unwrap();

        let items = store.list_items(cart.id).await.unwrap();
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[0].unit_price_cents, Some(1000));
    }

    #[tokio::test]
    async fn snapshot_backfills_when_previously_unset() {
        let (_temp, store) = test_store().await;
        seed_product(&store, "p1", None).await;
        let (cart, _) = store.resolve_active_cart(None, None, now()).await.unwrap();

        store.add_item(cart.id, "p1", 1, true, now()).await.unwrap();
        let items = store.list_items(cart.id).await.unwrap();
        assert_eq!(items[0].unit_price_cents, None);

        // The product gains a price; the next add fills the empty snapshot.
        sqlx::query("UPDATE products SET price_cents = 700 WHERE id = 'p1'")
            .execute(store.pool())
            .await
            .unwrap();
        store.add_item(cart.id, "p1", 1, true, now()).await.unwrap();

        let items = store.list_items(cart.id).await.unwrap();
        assert_eq!(items[0].unit_price_cents, Some(700));
    }

    #[tokio::test]
    async fn item_mutations_are_scoped_to_their_cart() {
        let (_temp, store) = test_store().await;
        seed_product(&store, "p1", Some(100)).await;
        let (cart_a, _) = store.resolve_active_cart(None, None, now()).await.unwrap();
        let (cart_b, _) = store.resolve_active_cart(None, None, now()).await.unwrap();
        store.add_item(cart_a.id, "p1", 2, true, now()).await.unwrap();
        let item = store.list_items(cart_a.id).await.unwrap().remove(0);

        // Another cart's id must not reach the item.
        let cross_set = store.set_item_quantity(cart_b.id, item.id, 9, now()).await;
        assert!(matches!(cross_set, Err(StoreError::NotFound(_))));
        let cross_remove = store.remove_item(cart_b.id, item.id).await;
        assert!(matches!(cross_remove, Err(StoreError::NotFound(_))));

        let items = store.list_items(cart_a.id).await.unwrap();
        assert_eq!(items[0].quantity, 2);

        store.set_item_quantity(cart_a.id, item.id, 9, now()).await.unwrap();
        assert_eq!(store.list_items(cart_a.id).await.unwrap()[0].quantity, 9);

        store.remove_item(cart_a.id, item.id).await.unwrap();
        assert!(store.list_items(cart_a.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_items_is_idempotent() {
        let (_temp, store) = test_store().await;
        seed_product(&store, "p1", Some(100)).await;
        let (cart, _) = store.resolve_active_cart(None, None, now()).await.unwrap();
        store.add_item(cart.id, "p1", 2, true, now()).await.unwrap();

        store.clear_items(cart.id).await.unwrap();
        assert!(store.list_items(cart.id).await.unwrap().is_empty());
        // Clearing an already-empty cart succeeds and changes nothing.
        store.clear_items(cart.id).await.unwrap();
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    #[tokio::test]
    async fn checkout_of_empty_cart_fails_and_leaves_it_active() {
        let (_temp, store) = test_store().await;
        let (cart, _) = store.resolve_active_cart(None, None, now()).await.unwrap();

        let result = store.checkout_cart(cart.id, now()).await;
        assert!(matches!(result, Err(StoreError::EmptyCart)));

        let reloaded = store.get_cart(cart.id).await.unwrap().unwrap();
        assert!(reloaded.is_active());
    }

    #[tokio::test]
    async fn checkout_orders_cart_and_creates_replacement() {
        let (_temp, store) = test_store().await;
        let user = seed_user(&store, "a@example.com").await;
        seed_product(&store, "p1", Some(100)).await;
        let (cart, _) = store
            .resolve_active_cart(Some(user.id), None, now())
            .await
            .unwrap();
        store.add_item(cart.id, "p1", 2, true, now()).await.unwrap();

        let (ordered, fresh) = store.checkout_cart(cart.id, now()).await.unwrap();
        assert_eq!(ordered.id, cart.id);
        assert_eq!(ordered.status, CartStatus::Ordered.as_str());
        assert_eq!(fresh.user_id, Some(user.id));
        assert!(fresh.is_active());
        assert!(store.list_items(fresh.id).await.unwrap().is_empty());

        // The replacement is now the user's one active cart.
        let active = store.get_active_cart_for_user(user.id).await.unwrap().unwrap();
        assert_eq!(active.id, fresh.id);

        // A second checkout of the same cart is a NotFound, not a new order.
        let again = store.checkout_cart(cart.id, now()).await;
        assert!(matches!(again, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn guest_checkout_creates_guest_replacement() {
        let (_temp, store) = test_store().await;
        seed_product(&store, "p1", Some(100)).await;
        let (cart, _) = store.resolve_active_cart(None, None, now()).await.unwrap();
        store.add_item(cart.id, "p1", 1, true, now()).await.unwrap();

        let (_, fresh) = store.checkout_cart(cart.id, now()).await.unwrap();
        assert!(fresh.user_id.is_none());
        assert!(fresh.is_active());
    }

    // =========================================================================
    // Guest merge
    // =========================================================================

    #[tokio::test]
    async fn merge_sums_overlapping_products() {
        let (_temp, store) = test_store().await;
        let user = seed_user(&store, "a@example.com").await;
        seed_product(&store, "a", Some(100)).await;
        seed_product(&store, "b", Some(200)).await;

        let (user_cart, _) = store
            .resolve_active_cart(Some(user.id), None, now())
            .await
            .unwrap();
        store.add_item(user_cart.id, "a", 3, true, now()).await.unwrap();

        let (guest, _) = store.resolve_active_cart(None, None, now()).await.unwrap();
        store.add_item(guest.id, "a", 2, true, now()).await.unwrap();
        store.add_item(guest.id, "b", 1, true, now()).await.unwrap();

        let merged = store
            .merge_guest_cart(guest.id, user.id, now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(merged.id, user_cart.id);

        let mut items = store.list_items(user_cart.id).await.unwrap();
        items.sort_by(|a, b| a.product_id.cmp(&b.product_id));
        assert_eq!(items.len(), 2);
        assert_eq!((items[0].product_id.as_str(), items[0].quantity), ("a", 5));
        assert_eq!((items[1].product_id.as_str(), items[1].quantity), ("b", 1));

        let guest_after = store.get_cart(guest.id).await.unwrap().unwrap();
        assert_eq!(guest_after.status, CartStatus::Merged.as_str());

        // No third cart appeared for the user.
        assert_eq!(cart_count_for_user(&store, user.id).await, 1);
    }

    #[tokio::test]
    async fn merge_reassigns_guest_cart_when_user_has_none() {
        let (_temp, store) = test_store().await;
        let user = seed_user(&store, "a@example.com").await;
        seed_product(&store, "a", Some(100)).await;

        let (guest, _) = store.resolve_active_cart(None, None, now()).await.unwrap();
        store.add_item(guest.id, "a", 2, true, now()).await.unwrap();

        let merged = store
            .merge_guest_cart(guest.id, user.id, now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(merged.id, guest.id);
        assert_eq!(merged.user_id, Some(user.id));
        assert_eq!(merged.status, CartStatus::Active.as_str());
        assert_eq!(store.list_items(guest.id).await.unwrap()[0].quantity, 2);
    }

    #[tokio::test]
    async fn merge_is_a_noop_for_missing_or_consumed_guest_carts() {
        let (_temp, store) = test_store().await;
        let user = seed_user(&store, "a@example.com").await;

        // Unknown guest cart, user has no cart yet.
        let merged = store
            .merge_guest_cart(Uuid::new_v4(), user.id, now())
            .await
            .unwrap();
        assert!(merged.is_none());

        // Ordered guest cart: still a no-op, returns the user's active cart.
        seed_product(&store, "a", Some(100)).await;
        let (guest, _) = store.resolve_active_cart(None, None, now()).await.unwrap();
        store.add_item(guest.id, "a", 1, true, now()).await.unwrap();
        store.checkout_cart(guest.id, now()).await.unwrap();

        let (user_cart, _) = store
            .resolve_active_cart(Some(user.id), None, now())
            .await
            .unwrap();
        let merged = store
            .merge_guest_cart(guest.id, user.id, now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(merged.id, user_cart.id);
        assert!(store.list_items(user_cart.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn merge_keeps_existing_snapshot_and_carries_guest_snapshot() {
        let (_temp, store) = test_store().await;
        let user = seed_user(&store, "a@example.com").await;
        seed_product(&store, "a", Some(100)).await;
        seed_product(&store, "b", Some(200)).await;

        let (user_cart, _) = store
            .resolve_active_cart(Some(user.id), None, now())
            .await
            .unwrap();
        store.add_item(user_cart.id, "a", 1, true, now()).await.unwrap();

        let (guest, _) = store.resolve_active_cart(None, None, now()).await.unwrap();
        // The guest saw different prices.
        sqlx::query("UPDATE products SET price_cents = 150 WHERE id = 'a'")
            .execute(store.pool())
            .await
            .unwrap();
        sqlx::query("UPDATE products SET price_cents = 250 WHERE id = 'b'")
            .execute(store.pool())
            .await
            .unwrap();
        store.add_item(guest.id, "a", 1, true, now()).await.unwrap();
        store.add_item(guest.id, "b", 1, true, now()).await.unwrap();

        store.merge_guest_cart(guest.id, user.id, now()).await.unwrap();

        let mut items = store.list_items(user_cart.id).await.unwrap();
        items.sort_by(|a, b| a.product_id.cmp(&b.product_id));
        // The user's earlier snapshot survives; the new row keeps the
        // guest's snapshot.
        assert_eq!(items[0].unit_price_cents, Some(100));
        assert_eq!(items[1].unit_price_cents, Some(250));
    }

    // =========================================================================
    // Users, sessions, orders
    // =========================================================================

    #[tokio::test]
    async fn duplicate_email_is_already_exists() {
        let (_temp, store) = test_store().await;
        seed_user(&store, "a@example.com").await;

        let dup = UserRow {
            id: Uuid::new_v4(),
            email: "a@example.com".to_string(),
            name: None,
            created_at: now(),
            updated_at: now(),
        };
        let result = store.create_user(&dup).await;
        assert!(matches!(result, Err(StoreError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn sessions_round_trip_by_hash() {
        let (_temp, store) = test_store().await;
        let user = seed_user(&store, "a@example.com").await;
        let session = SessionRow {
            id: Uuid::new_v4(),
            user_id: user.id,
            token_hash: "deadbeef".to_string(),
            expires_at: now() + time::Duration::days(30),
            created_at: now(),
        };
        store.create_session(&session).await.unwrap();

        let found = store.get_session_by_hash("deadbeef").await.unwrap().unwrap();
        assert_eq!(found.user_id, user.id);

        store.delete_session(session.id).await.unwrap();
        assert!(store.get_session_by_hash("deadbeef").await.unwrap().is_none());
        // Deleting again is fine.
        store.delete_session(session.id).await.unwrap();
    }

    #[tokio::test]
    async fn order_summaries_aggregate_and_sort_newest_first() {
        let (_temp, store) = test_store().await;
        let user = seed_user(&store, "a@example.com").await;
        seed_product(&store, "a", Some(100)).await;
        seed_product(&store, "b", None).await;

        let t1 = now() - time::Duration::hours(2);
        let t2 = now() - time::Duration::hours(1);

        let (cart1, _) = store
            .resolve_active_cart(Some(user.id), None, t1)
            .await
            .unwrap();
        store.add_item(cart1.id, "a", 2, true, t1).await.unwrap();
        store.checkout_cart(cart1.id, t1).await.unwrap();

        let (cart2, _) = store
            .resolve_active_cart(Some(user.id), None, t2)
            .await
            .unwrap();
        store.add_item(cart2.id, "a", 1, true, t2).await.unwrap();
        // No snapshot and no catalog price: counts toward quantity only.
        store.add_item(cart2.id, "b", 4, true, t2).await.unwrap();
        store.checkout_cart(cart2.id, t2).await.unwrap();

        let summaries = store.list_order_summaries(user.id).await.unwrap();
        assert_eq!(summaries.len(), 2);

        assert_eq!(summaries[0].order_id, cart2.id);
        assert_eq!(summaries[0].quantity_purchased, 5);
        assert_eq!(summaries[0].subtotal_cents, 100);

        assert_eq!(summaries[1].order_id, cart1.id);
        assert_eq!(summaries[1].quantity_purchased, 2);
        assert_eq!(summaries[1].subtotal_cents, 200);
    }
}
