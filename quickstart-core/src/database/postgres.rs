use crate::{
    database::infrastructure::postgres::repositories::users::PostgresUserCollection,
    error::{Result, StoreError},
};
use sqlx::{
    PgPool,
    postgres::{PgConnectOptions, PgPoolOptions},
};
use std::{fmt, time::Duration};
use tracing::info;

/// Statistics about the connection pool
#[derive(Debug, Clone)]
pub struct PoolStats {
    /// Open connections, idle or in use.
    pub size: u32,
    /// Connections waiting in the pool.
    pub idle: u32,
    /// Configured upper bound.
    pub max_size: u32,
}

/// Connection pool plus the collections stored in it.
#[derive(Clone)]
pub struct PostgresDatabase {
    pool: PgPool,
    max_connections: u32,
    users: PostgresUserCollection,
}

impl fmt::Debug for PostgresDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresDatabase")
            .field("pool_size", &self.pool.size())
            .field("idle_connections", &self.pool.num_idle())
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl PostgresDatabase {
    /// Connect to `connection_string`. An empty string defers to the `PG*`
    /// environment variables.
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self> {
        let connect_options = Self::build_connect_options(connection_string)?;
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .max_lifetime(Duration::from_secs(1800))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect_with(connect_options)
            .await
            .map_err(|e| StoreError::Internal(format!("Database connection failed: {}", e)))?;

        info!(max_connections, "Database pool initialized");

        Ok(Self::with_pool(pool, max_connections))
    }

    /// Wrap an existing pool (mainly for testing)
    pub fn from_pool(pool: PgPool) -> Self {
        let max_connections = pool.options().get_max_connections();
        Self::with_pool(pool, max_connections)
    }

    fn with_pool(pool: PgPool, max_connections: u32) -> Self {
        let users = PostgresUserCollection::new(pool.clone());
        Self {
            pool,
            max_connections,
            users,
        }
    }

    fn build_connect_options(connection_string: &str) -> Result<PgConnectOptions> {
        let trimmed = connection_string.trim();

        if trimmed.is_empty() {
            // Falls back to the libpq PG* environment variables.
            return Ok(PgConnectOptions::new());
        }

        trimmed.parse::<PgConnectOptions>().map_err(|e| {
            StoreError::Internal(format!("Invalid PostgreSQL connection string: {}", e))
        })
    }

    /// Apply the embedded migrations.
    pub async fn migrate(&self) -> Result<()> {
        crate::MIGRATOR.run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// The `user_documents` collection.
    pub fn users(&self) -> &PostgresUserCollection {
        &self.users
    }

    /// Snapshot of the pool for health reporting.
    pub fn pool_stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle() as u32,
            max_size: self.max_connections,
        }
    }
}
