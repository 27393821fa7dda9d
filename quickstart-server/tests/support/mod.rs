#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use quickstart_core::{
    InMemoryUserCollection, StoreError, UserChangeSet, UserCollection, UserDocument,
};
use quickstart_server::{
    create_app,
    infra::{app_state::AppState, config::Config},
};
use uuid::Uuid;

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".into();
    config.server.port = 0;
    config.dev_mode = true;
    config
}

#[derive(Debug)]
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub users: Arc<InMemoryUserCollection>,
}

pub fn build_test_app() -> TestApp {
    build_test_app_with(InMemoryUserCollection::new())
}

pub fn build_test_app_with(collection: InMemoryUserCollection) -> TestApp {
    let users = Arc::new(collection);
    let state = AppState::new(Arc::new(test_config()), users.clone());
    let router = create_app(state.clone());
    TestApp {
        router,
        state,
        users,
    }
}

pub fn test_server() -> (TestServer, Arc<InMemoryUserCollection>) {
    let app = build_test_app();
    let server = TestServer::new(app.router).expect("build test server");
    (server, app.users)
}

/// A collection whose every call fails, standing in for an unreachable
/// database.
#[derive(Debug, Default)]
pub struct UnavailableCollection;

fn unavailable() -> StoreError {
    StoreError::Internal("connection refused".into())
}

#[async_trait]
impl UserCollection for UnavailableCollection {
    async fn list_all(&self) -> quickstart_core::Result<Vec<UserDocument>> {
        Err(unavailable())
    }

    async fn find_by_id(&self, _id: Uuid) -> quickstart_core::Result<Option<UserDocument>> {
        Err(unavailable())
    }

    async fn find_by_username(
        &self,
        _username: &str,
    ) -> quickstart_core::Result<Option<UserDocument>> {
        Err(unavailable())
    }

    async fn insert(&self, _doc: &UserDocument) -> quickstart_core::Result<()> {
        Err(unavailable())
    }

    async fn update_by_id(
        &self,
        _id: Uuid,
        _changes: &UserChangeSet,
    ) -> quickstart_core::Result<Option<UserDocument>> {
        Err(unavailable())
    }

    async fn delete_by_id(&self, _id: Uuid) -> quickstart_core::Result<bool> {
        Err(unavailable())
    }

    async fn health_check(&self) -> quickstart_core::Result<()> {
        Err(unavailable())
    }
}

pub fn unavailable_server() -> TestServer {
    let state = AppState::new(Arc::new(test_config()), Arc::new(UnavailableCollection));
    TestServer::new(create_app(state)).expect("build test server")
}
