//! CRUD controller for the users resource.
//!
//! [`UserViewSet`] binds the five resource operations to the user collection:
//! it resolves the queryset, runs the serializer over inbound payloads,
//! enforces username uniqueness, performs the storage call and renders the
//! result. HTTP concerns (status codes, routing, identifiers in paths) live in
//! the server crate.

use std::{fmt, sync::Arc};

use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use super::serializer::{
    MSG_UNIQUE, UserChangeSet, UserRepresentation, UserSerializer, ValidationErrors, ValidationMode,
};
use crate::database::ports::users::UserCollection;
use crate::error::StoreError;

/// Outcome of a failed viewset operation.
#[derive(Debug, Error)]
pub enum ViewSetError {
    /// The payload was rejected; per-field messages attached.
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    /// No document has the requested id.
    #[error("User not found")]
    NotFound,

    /// The collection failed. Already logged.
    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for ViewSetError {
    fn from(err: StoreError) -> Self {
        match err {
            // A writer raced us past the uniqueness check.
            StoreError::Conflict { field } => {
                Self::Validation(ValidationErrors::single(field, MSG_UNIQUE))
            }
            other => {
                error!(error = %other, "user collection operation failed");
                Self::Storage(other)
            }
        }
    }
}

/// Result alias for viewset operations.
pub type ViewSetResult<T> = Result<T, ViewSetError>;

/// Resource controller over the full, unfiltered user collection.
#[derive(Clone)]
pub struct UserViewSet {
    users: Arc<dyn UserCollection>,
}

impl fmt::Debug for UserViewSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserViewSet").finish_non_exhaustive()
    }
}

impl UserViewSet {
    /// Viewset over `users`.
    pub fn new(users: Arc<dyn UserCollection>) -> Self {
        Self { users }
    }

    /// The collection every operation runs against. No narrowing is applied.
    pub fn queryset(&self) -> &dyn UserCollection {
        self.users.as_ref()
    }

    /// Every user, in collection order.
    pub async fn list(&self) -> ViewSetResult<Vec<UserRepresentation>> {
        let documents = self.queryset().list_all().await?;
        Ok(documents.iter().map(UserSerializer::to_representation).collect())
    }

    /// One user by id.
    pub async fn retrieve(&self, id: Uuid) -> ViewSetResult<UserRepresentation> {
        let doc = self
            .queryset()
            .find_by_id(id)
            .await?
            .ok_or(ViewSetError::NotFound)?;
        Ok(UserSerializer::to_representation(&doc))
    }

    /// Validate and insert a new user. Returns the new document id alongside
    /// its representation.
    pub async fn create(&self, payload: &Value) -> ViewSetResult<(Uuid, UserRepresentation)> {
        let changes = UserSerializer::validate(payload, ValidationMode::Create)?;
        self.ensure_unique_username(&changes, None).await?;

        let doc = changes.into_document();
        self.queryset().insert(&doc).await?;

        info!(
            target: "user.viewset",
            user_id = %doc.id,
            username = %doc.username,
            action = "create"
        );

        Ok((doc.id, UserSerializer::to_representation(&doc)))
    }

    /// Full update: every required exposed field must be supplied.
    pub async fn update(&self, id: Uuid, payload: &Value) -> ViewSetResult<UserRepresentation> {
        self.apply_update(id, payload, ValidationMode::Update).await
    }

    /// Partial update: only the supplied exposed fields change.
    pub async fn partial_update(&self, id: Uuid, payload: &Value) -> ViewSetResult<UserRepresentation> {
        self.apply_update(id, payload, ValidationMode::PartialUpdate)
            .await
    }

    /// Remove the document with `id`.
    pub async fn destroy(&self, id: Uuid) -> ViewSetResult<()> {
        if !self.queryset().delete_by_id(id).await? {
            return Err(ViewSetError::NotFound);
        }

        info!(target: "user.viewset", user_id = %id, action = "destroy");
        Ok(())
    }

    async fn apply_update(
        &self,
        id: Uuid,
        payload: &Value,
        mode: ValidationMode,
    ) -> ViewSetResult<UserRepresentation> {
        let current = self
            .queryset()
            .find_by_id(id)
            .await?
            .ok_or(ViewSetError::NotFound)?;

        let changes = UserSerializer::validate(payload, mode)?;
        self.ensure_unique_username(&changes, Some(id)).await?;

        let doc = if changes.is_empty() {
            current
        } else {
            self.queryset()
                .update_by_id(id, &changes)
                .await?
                .ok_or(ViewSetError::NotFound)?
        };

        let action = if mode.is_partial() {
            "partial_update"
        } else {
            "update"
        };
        info!(
            target: "user.viewset",
            user_id = %id,
            username = %doc.username,
            action
        );

        Ok(UserSerializer::to_representation(&doc))
    }

    async fn ensure_unique_username(
        &self,
        changes: &UserChangeSet,
        exclude: Option<Uuid>,
    ) -> ViewSetResult<()> {
        let Some(username) = changes.username.as_deref() else {
            return Ok(());
        };

        if let Some(existing) = self.queryset().find_by_username(username).await?
            && Some(existing.id) != exclude
        {
            return Err(ValidationErrors::single("username", MSG_UNIQUE).into());
        }

        Ok(())
    }
}
