//! HTTP surface for the users resource.
//!
//! The binary in `main.rs` wires configuration, logging and the storage
//! backend together; everything it serves is assembled by [`create_app`] so
//! integration tests can drive the same router.

pub mod infra;
pub mod routes;
pub mod users;

pub use routes::create_app;
