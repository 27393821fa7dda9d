pub mod infrastructure;
pub mod ports;
/// Pool management and migrations
pub mod postgres;

pub use infrastructure::{
    memory::users::InMemoryUserCollection,
    postgres::repositories::users::PostgresUserCollection,
};
pub use ports::users::UserCollection;
pub use postgres::{PoolStats, PostgresDatabase};
