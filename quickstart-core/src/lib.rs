//! # Quickstart Core
//!
//! Domain types and storage for the quickstart users endpoint.
//!
//! ## Overview
//!
//! - **User documents**: the full user schema, of which only `username` and
//!   `email` are ever exposed over the wire
//! - **Serializer**: a statically declared two-field mapping with validators
//! - **ViewSet**: list/retrieve/create/update/destroy over the user collection
//! - **Collections**: a trait-based document collection port with PostgreSQL
//!   (JSONB documents) and in-memory backends
//!
//! ## Architecture
//!
//! - [`domain::users`]: user document, serializer and viewset
//! - [`database`]: collection port and its implementations
//! - [`error`]: storage error type shared by every backend
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use quickstart_core::{InMemoryUserCollection, UserViewSet};
//! use serde_json::json;
//!
//! async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//!     let viewset = UserViewSet::new(Arc::new(InMemoryUserCollection::new()));
//!     let (id, created) = viewset
//!         .create(&json!({"username": "alice", "email": "alice@example.com"}))
//!         .await?;
//!     assert_eq!(viewset.retrieve(id).await?, created);
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

/// Document collection port and storage backends
pub mod database;

/// Storage error types
pub mod error;

/// User domain: documents, serializer and viewset
pub mod domain;

/// Embedded migrations for the PostgreSQL document table
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub use database::{
    InMemoryUserCollection, PostgresDatabase, PostgresUserCollection, UserCollection,
};
pub use domain::users::{
    serializer::{UserChangeSet, UserRepresentation, UserSerializer, ValidationErrors, ValidationMode},
    user::UserDocument,
    viewset::{UserViewSet, ViewSetError},
};
pub use error::{Result, StoreError};
