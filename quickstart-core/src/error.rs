use thiserror::Error;

/// Failures raised by a user collection backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A unique index rejected the write.
    #[error("Duplicate value for unique field: {field}")]
    Conflict {
        /// Document key the index covers.
        field: String,
    },

    /// A document could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The database driver failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Applying the embedded migrations failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Any other backend failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result alias for collection operations.
pub type Result<T> = std::result::Result<T, StoreError>;
