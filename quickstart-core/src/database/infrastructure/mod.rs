//! Adapters implementing the repository ports.

/// Process-local backend
pub mod memory;
/// JSONB document backend
pub mod postgres;
