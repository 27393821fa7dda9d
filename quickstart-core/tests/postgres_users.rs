//! PostgreSQL-backed user collection tests.
//!
//! Run with `--features postgres-tests` and `DATABASE_URL` pointing at a
//! database the test role may create scratch databases in.
#![cfg(feature = "postgres-tests")]

use quickstart_core::{
    PostgresDatabase, StoreError, UserChangeSet, UserCollection, UserDocument, UserViewSet,
    ViewSetError,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

type TestResult = Result<(), StoreError>;

#[sqlx::test(migrator = "quickstart_core::MIGRATOR")]
async fn insert_find_and_list_round_trip(pool: PgPool) -> TestResult {
    let db = PostgresDatabase::from_pool(pool);
    let users = db.users();

    let alice = UserDocument::new("alice", "alice@example.com");
    let bob = UserDocument::new("bob", "");
    users.insert(&alice).await?;
    users.insert(&bob).await?;

    let found = users.find_by_id(alice.id).await?.expect("alice stored");
    assert_eq!(found.username, "alice");
    assert_eq!(found.id, alice.id);

    let by_name = users.find_by_username("bob").await?.expect("bob stored");
    assert_eq!(by_name.id, bob.id);

    let names: Vec<_> = users
        .list_all()
        .await?
        .into_iter()
        .map(|doc| doc.username)
        .collect();
    assert_eq!(names, ["alice", "bob"]);

    Ok(())
}

#[sqlx::test(migrator = "quickstart_core::MIGRATOR")]
async fn unique_index_rejects_duplicate_usernames(pool: PgPool) -> TestResult {
    let db = PostgresDatabase::from_pool(pool);
    let users = db.users();

    users.insert(&UserDocument::new("alice", "")).await?;
    let err = users
        .insert(&UserDocument::new("alice", "second@example.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Conflict { ref field } if field == "username"));
    Ok(())
}

#[sqlx::test(migrator = "quickstart_core::MIGRATOR")]
async fn update_merges_without_dropping_foreign_keys(pool: PgPool) -> TestResult {
    let db = PostgresDatabase::from_pool(pool);
    let users = db.users();

    let mut doc = UserDocument::new("alice", "alice@example.com");
    doc.password = "argon2$hash".into();
    doc.extra.insert("avatar".into(), json!("alice.png"));
    users.insert(&doc).await?;

    let updated = users
        .update_by_id(
            doc.id,
            &UserChangeSet {
                username: None,
                email: Some("alice@new.example.com".into()),
            },
        )
        .await?
        .expect("document exists");

    assert_eq!(updated.username, "alice");
    assert_eq!(updated.email, "alice@new.example.com");
    assert_eq!(updated.password, "argon2$hash");
    assert_eq!(updated.extra.get("avatar"), Some(&json!("alice.png")));

    let missing = users
        .update_by_id(Uuid::now_v7(), &UserChangeSet::default())
        .await?;
    assert!(missing.is_none());
    Ok(())
}

#[sqlx::test(migrator = "quickstart_core::MIGRATOR")]
async fn viewset_crud_against_postgres(pool: PgPool) -> TestResult {
    let db = PostgresDatabase::from_pool(pool);
    db.users().health_check().await?;
    let viewset = UserViewSet::new(Arc::new(db.users().clone()));

    let (id, created) = viewset
        .create(&json!({"username": "alice", "email": "alice@example.com"}))
        .await
        .expect("create");
    assert_eq!(viewset.retrieve(id).await.expect("retrieve"), created);

    viewset.destroy(id).await.expect("destroy");
    assert!(matches!(viewset.retrieve(id).await, Err(ViewSetError::NotFound)));
    assert!(!db.users().delete_by_id(id).await?);
    Ok(())
}
