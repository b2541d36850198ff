//! User repository.

use crate::error::StoreResult;
use crate::models::UserRow;
use async_trait::async_trait;
use uuid::Uuid;

/// Repository for user operations.
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Create a user. Fails with `AlreadyExists` on a duplicate email.
    async fn create_user(&self, user: &UserRow) -> StoreResult<()>;

    /// Get a user by ID.
    async fn get_user(&self, user_id: Uuid) -> StoreResult<Option<UserRow>>;

    /// Get a user by normalized email.
    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>>;
}
