//! sqlx repositories, one per table.

/// `user_documents` table
pub mod users;
