pub mod viewset_handlers;

pub use viewset_handlers::*;
