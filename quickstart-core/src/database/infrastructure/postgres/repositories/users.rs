use async_trait::async_trait;
use sqlx::{PgPool, types::Json};
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::ports::users::UserCollection;
use crate::{
    domain::users::{serializer::UserChangeSet, user::UserDocument},
    error::{Result, StoreError},
};

const USERNAME_UNIQUE_CONSTRAINT: &str = "user_documents_username_key";

/// One row of `user_documents`: the collection key and the document body.
#[derive(Debug, sqlx::FromRow)]
struct UserDocumentRow {
    id: Uuid,
    doc: Json<UserDocument>,
}

impl From<UserDocumentRow> for UserDocument {
    fn from(row: UserDocumentRow) -> Self {
        row.doc.0.with_id(row.id)
    }
}

/// PostgreSQL-backed implementation of the `UserCollection` port.
///
/// Documents live in a JSONB column; updates are merged with `doc || patch`
/// so keys this crate does not know about are never dropped.
#[derive(Clone, Debug)]
pub struct PostgresUserCollection {
    pool: PgPool,
}

impl PostgresUserCollection {
    /// Collection over the `user_documents` table reachable through `pool`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_write_error(err: sqlx::Error) -> StoreError {
    if let Some(db_err) = err.as_database_error()
        && db_err.constraint() == Some(USERNAME_UNIQUE_CONSTRAINT)
    {
        return StoreError::Conflict {
            field: "username".to_string(),
        };
    }
    StoreError::Database(err)
}

#[async_trait]
impl UserCollection for PostgresUserCollection {
    async fn list_all(&self) -> Result<Vec<UserDocument>> {
        let rows = sqlx::query_as::<_, UserDocumentRow>(
            r#"
            SELECT id, doc
            FROM user_documents
            ORDER BY seq
            "#,
        )
        .fetch_all(self.pool())
        .await?;

        debug!("Retrieved {} user documents", rows.len());
        Ok(rows.into_iter().map(UserDocument::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserDocument>> {
        let row = sqlx::query_as::<_, UserDocumentRow>(
            r#"
            SELECT id, doc
            FROM user_documents
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(UserDocument::from))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserDocument>> {
        let row = sqlx::query_as::<_, UserDocumentRow>(
            r#"
            SELECT id, doc
            FROM user_documents
            WHERE doc->>'username' = $1
            "#,
        )
        .bind(username)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(UserDocument::from))
    }

    async fn insert(&self, doc: &UserDocument) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_documents (id, doc)
            VALUES ($1, $2)
            "#,
        )
        .bind(doc.id)
        .bind(Json(doc))
        .execute(self.pool())
        .await
        .map_err(map_write_error)?;

        info!("Inserted user document: {} ({})", doc.username, doc.id);
        Ok(())
    }

    async fn update_by_id(&self, id: Uuid, changes: &UserChangeSet) -> Result<Option<UserDocument>> {
        let row = sqlx::query_as::<_, UserDocumentRow>(
            r#"
            UPDATE user_documents
            SET doc = doc || $2
            WHERE id = $1
            RETURNING id, doc
            "#,
        )
        .bind(id)
        .bind(Json(changes.to_patch()))
        .fetch_optional(self.pool())
        .await
        .map_err(map_write_error)?;

        Ok(row.map(UserDocument::from))
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_documents WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(self.pool()).await?;
        Ok(())
    }
}
