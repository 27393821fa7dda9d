use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::database::ports::users::UserCollection;
use crate::{
    domain::users::{serializer::UserChangeSet, user::UserDocument},
    error::{Result, StoreError},
};

/// Process-local user collection for development and tests.
///
/// Documents are kept in insertion order. Writers hold the lock across the
/// uniqueness check and the write, so the username index is never violated.
#[derive(Debug, Default)]
pub struct InMemoryUserCollection {
    documents: RwLock<Vec<UserDocument>>,
}

impl InMemoryUserCollection {
    /// An empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the collection, e.g. with documents owned by another subsystem.
    pub fn with_documents(documents: Vec<UserDocument>) -> Self {
        Self {
            documents: RwLock::new(documents),
        }
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// True when no documents are stored.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

fn username_taken(documents: &[UserDocument], username: &str, exclude: Option<Uuid>) -> bool {
    documents
        .iter()
        .any(|doc| doc.username == username && Some(doc.id) != exclude)
}

#[async_trait]
impl UserCollection for InMemoryUserCollection {
    async fn list_all(&self) -> Result<Vec<UserDocument>> {
        Ok(self.documents.read().await.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserDocument>> {
        let documents = self.documents.read().await;
        Ok(documents.iter().find(|doc| doc.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserDocument>> {
        let documents = self.documents.read().await;
        Ok(documents.iter().find(|doc| doc.username == username).cloned())
    }

    async fn insert(&self, doc: &UserDocument) -> Result<()> {
        let mut documents = self.documents.write().await;

        if documents.iter().any(|existing| existing.id == doc.id) {
            return Err(StoreError::Internal(format!(
                "Document {} already exists",
                doc.id
            )));
        }
        if username_taken(&documents, &doc.username, None) {
            return Err(StoreError::Conflict {
                field: "username".to_string(),
            });
        }

        documents.push(doc.clone());
        info!("Inserted user document: {} ({})", doc.username, doc.id);
        Ok(())
    }

    async fn update_by_id(&self, id: Uuid, changes: &UserChangeSet) -> Result<Option<UserDocument>> {
        let mut documents = self.documents.write().await;

        if let Some(username) = changes.username.as_deref()
            && username_taken(&documents, username, Some(id))
        {
            return Err(StoreError::Conflict {
                field: "username".to_string(),
            });
        }

        Ok(documents.iter_mut().find(|doc| doc.id == id).map(|doc| {
            changes.apply_to(doc);
            doc.clone()
        }))
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        let mut documents = self.documents.write().await;
        let before = documents.len();
        documents.retain(|doc| doc.id != id);
        Ok(documents.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn lists_documents_in_insertion_order() {
        let collection = InMemoryUserCollection::new();
        for name in ["carol", "alice", "bob"] {
            collection
                .insert(&UserDocument::new(name, format!("{name}@example.com")))
                .await
                .unwrap();
        }

        let names: Vec<_> = collection
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|doc| doc.username)
            .collect();
        assert_eq!(names, ["carol", "alice", "bob"]);
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_username() {
        let collection = InMemoryUserCollection::new();
        collection.insert(&UserDocument::new("alice", "")).await.unwrap();

        let err = collection
            .insert(&UserDocument::new("alice", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { ref field } if field == "username"));
        assert_eq!(collection.len().await, 1);
    }

    #[tokio::test]
    async fn update_merges_changes_and_keeps_hidden_fields() {
        let mut doc = UserDocument::new("alice", "alice@example.com");
        doc.password = "argon2$hash".into();
        doc.extra.insert("theme".into(), json!("dark"));
        let id = doc.id;
        let collection = InMemoryUserCollection::with_documents(vec![doc]);

        let updated = collection
            .update_by_id(
                id,
                &UserChangeSet {
                    username: None,
                    email: Some("new@example.com".into()),
                },
            )
            .await
            .unwrap()
            .expect("document exists");

        assert_eq!(updated.username, "alice");
        assert_eq!(updated.email, "new@example.com");
        assert_eq!(updated.password, "argon2$hash");
        assert_eq!(updated.extra.get("theme"), Some(&json!("dark")));
    }

    #[tokio::test]
    async fn update_allows_keeping_own_username_but_not_taking_another() {
        let alice = UserDocument::new("alice", "");
        let bob = UserDocument::new("bob", "");
        let (alice_id, bob_id) = (alice.id, bob.id);
        let collection = InMemoryUserCollection::with_documents(vec![alice, bob]);

        let same = UserChangeSet {
            username: Some("alice".into()),
            email: None,
        };
        assert!(collection.update_by_id(alice_id, &same).await.unwrap().is_some());

        let err = collection.update_by_id(bob_id, &same).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn missing_documents_are_reported() {
        let collection = InMemoryUserCollection::new();
        let id = Uuid::now_v7();

        assert!(collection.find_by_id(id).await.unwrap().is_none());
        assert!(
            collection
                .update_by_id(id, &UserChangeSet::default())
                .await
                .unwrap()
                .is_none()
        );
        assert!(!collection.delete_by_id(id).await.unwrap());
    }

    #[tokio::test]
    async fn delete_removes_only_the_target() {
        let alice = UserDocument::new("alice", "");
        let bob = UserDocument::new("bob", "");
        let alice_id = alice.id;
        let collection = InMemoryUserCollection::with_documents(vec![alice, bob]);

        assert!(collection.delete_by_id(alice_id).await.unwrap());
        assert!(collection.find_by_id(alice_id).await.unwrap().is_none());
        assert!(collection.find_by_username("bob").await.unwrap().is_some());
        assert!(collection.health_check().await.is_ok());
    }
}
