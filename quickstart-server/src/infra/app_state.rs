use std::{fmt, sync::Arc};

use quickstart_core::{PostgresDatabase, UserCollection, UserViewSet};

use crate::infra::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub users: Arc<dyn UserCollection>,
    /// Present when documents are stored in PostgreSQL.
    pub postgres: Option<Arc<PostgresDatabase>>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("storage", &self.config.storage.backend)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(config: Arc<Config>, users: Arc<dyn UserCollection>) -> Self {
        Self {
            config,
            users,
            postgres: None,
        }
    }

    pub fn with_postgres(config: Arc<Config>, postgres: Arc<PostgresDatabase>) -> Self {
        let users: Arc<dyn UserCollection> = Arc::new(postgres.users().clone());
        Self {
            config,
            users,
            postgres: Some(postgres),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// A viewset over the full user collection. Cheap to build per request.
    pub fn viewset(&self) -> UserViewSet {
        UserViewSet::new(self.users.clone())
    }
}
