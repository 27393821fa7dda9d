//! The users resource: the stored document, its two-field wire mapping and
//! the CRUD controller binding the two together.

pub mod serializer;
pub mod user;
pub mod viewset;
