//! Test fixtures for seeding shop data.
//! Note: #[allow(dead_code)] because each test file compiles common/ separately.

use bazaar_store::ShopStore;
use bazaar_store::models::{ProductRow, SessionRow, UserRow};
use time::OffsetDateTime;
use uuid::Uuid;

/// Build a product row with a minor-unit price.
#[allow(dead_code)]
pub fn product(id: &str, name: &str, price_cents: i64) -> ProductRow {
    ProductRow {
        id: id.to_string(),
        name: name.to_string(),
        category: Some("Garment Upper body".to_string()),
        index_group: Some("Menswear".to_string()),
        color: Some("Black".to_string()),
        description: None,
        price: None,
        price_cents: Some(price_cents),
        currency: Some("EUR".to_string()),
        image_key: None,
        has_image: false,
    }
}

/// Build a product row carrying only the legacy major-unit float price.
#[allow(dead_code)]
pub fn float_priced_product(id: &str, name: &str, price: f64) -> ProductRow {
    ProductRow {
        price: Some(price),
        price_cents: None,
        ..product(id, name, 0)
    }
}

/// Insert products into the datastore.
#[allow(dead_code)]
pub async fn seed_products(store: &dyn ShopStore, products: &[ProductRow]) {
    store
        .insert_products(products)
        .await
        .expect("Failed to seed products");
}

/// Create a user plus a valid session, returning the raw session token.
#[allow(dead_code)]
pub async fn user_with_session(store: &dyn ShopStore, email: &str) -> (UserRow, String) {
    let now = OffsetDateTime::now_utc();
    let user = UserRow {
        id: Uuid::new_v4(),
        email: email.to_string(),
        name: None,
        created_at: now,
        updated_at: now,
    };
    store.create_user(&user).await.expect("Failed to create user");

    let token = bazaar_core::session::generate_token();
    let session = SessionRow {
        id: Uuid::new_v4(),
        user_id: user.id,
        token_hash: bazaar_core::session::hash_token(&token),
        expires_at: now + time::Duration::days(30),
        created_at: now,
    };
    store
        .create_session(&session)
        .await
        .expect("Failed to create session");

    (user, token)
}

/// Create a user whose only session is already expired, returning the raw
/// token of that expired session.
#[allow(dead_code)]
pub async fn user_with_expired_session(store: &dyn ShopStore, email: &str) -> (UserRow, String) {
    let now = OffsetDateTime::now_utc();
    let user = UserRow {
        id: Uuid::new_v4(),
        email: email.to_string(),
        name: None,
        created_at: now,
        updated_at: now,
    };
    store.create_user(&user).await.expect("Failed to create user");

    let token = bazaar_core::session::generate_token();
    let session = SessionRow {
        id: Uuid::new_v4(),
        user_id: user.id,
        token_hash: bazaar_core::session::hash_token(&token),
        expires_at: now - time::Duration::hours(1),
        created_at: now - time::Duration::days(31),
    };
    store
        .create_session(&session)
        .await
        .expect("Failed to create session");

    (user, token)
}
