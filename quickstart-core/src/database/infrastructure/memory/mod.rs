//! In-memory collections for development and tests.

/// `Vec`-backed user collection
pub mod users;
