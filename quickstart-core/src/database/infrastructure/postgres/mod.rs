//! PostgreSQL-backed collections.

pub mod repositories;
