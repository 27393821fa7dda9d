use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use quickstart_core::{InMemoryUserCollection, PostgresDatabase};
use tracing::{info, warn};

use crate::infra::{
    app_state::AppState,
    config::{Config, StorageBackend},
};

/// Connect to PostgreSQL using the configured URL and pool size.
pub async fn connect_postgres(config: &Config) -> Result<PostgresDatabase> {
    let url = config
        .database
        .url
        .as_deref()
        .ok_or_else(|| anyhow!("postgres storage selected but DATABASE_URL is not set"))?;

    PostgresDatabase::new(url, config.database.max_connections)
        .await
        .context("failed to connect to PostgreSQL")
}

/// Build the shared state for the configured storage backend. PostgreSQL
/// schemas are migrated before the state is handed out.
pub async fn build_state(config: Config) -> Result<AppState> {
    let config = Arc::new(config);

    match config.storage.backend {
        StorageBackend::Postgres => {
            let postgres = connect_postgres(&config).await?;
            postgres
                .migrate()
                .await
                .context("database migration failed")?;

            let stats = postgres.pool_stats();
            info!(
                backend = %config.storage.backend,
                pool_size = stats.size,
                max_connections = stats.max_size,
                "user collection ready"
            );
            Ok(AppState::with_postgres(config, Arc::new(postgres)))
        }
        StorageBackend::Memory => {
            warn!(
                backend = %config.storage.backend,
                "user collection is process-local; documents are lost on exit"
            );
            Ok(AppState::new(
                config,
                Arc::new(InMemoryUserCollection::new()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend_needs_no_database() {
        let state = build_state(Config::default()).await.unwrap();
        assert!(state.postgres.is_none());
        assert!(state.viewset().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn postgres_backend_requires_url() {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Postgres;

        let err = build_state(config).await.unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }
}
