//! Session repository.

use crate::error::StoreResult;
use crate::models::SessionRow;
use async_trait::async_trait;
use uuid::Uuid;

/// Repository for authentication sessions.
#[async_trait]
pub trait SessionRepo: Send + Sync {
    /// Create a session.
    async fn create_session(&self, session: &SessionRow) -> StoreResult<()>;

    /// Get a session by token hash.
    async fn get_session_by_hash(&self, token_hash: &str) -> StoreResult<Option<SessionRow>>;

    /// Delete a session. Deleting a missing session is not an error.
    async fn delete_session(&self, session_id: Uuid) -> StoreResult<()>;
}
