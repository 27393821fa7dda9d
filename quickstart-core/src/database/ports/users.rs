use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::users::{serializer::UserChangeSet, user::UserDocument};
use crate::error::Result;

/// Document collection holding every user record.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserCollection: Send + Sync {
    /// Every document, in insertion order.
    async fn list_all(&self) -> Result<Vec<UserDocument>>;
    /// Looks a document up by its collection key.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserDocument>>;
    /// Exact, case-sensitive username match.
    async fn find_by_username(&self, username: &str) -> Result<Option<UserDocument>>;
    /// Fails with `StoreError::Conflict` when the username is already taken.
    async fn insert(&self, doc: &UserDocument) -> Result<()>;
    /// Merges the change set into the stored document and returns the result,
    /// or `None` when no document has this id.
    async fn update_by_id(&self, id: Uuid, changes: &UserChangeSet) -> Result<Option<UserDocument>>;
    /// Returns whether a document was removed.
    async fn delete_by_id(&self, id: Uuid) -> Result<bool>;

    /// Cheap round trip to the backend, used by `/health`.
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
