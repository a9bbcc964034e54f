/// In-memory store
///
/// Backs the integration tests and local demos. Each trait method takes the
/// lock once, so single operations are atomic just like their SQL
/// counterparts.

use super::{PostStore, Store, UserStore, USERNAME_TAKEN};
use crate::error::{DomainError, DomainResult};
use crate::models::post::{NewPost, Post, PostPatch, POST_SCHEMA};
use crate::models::user::{NewUser, User, USER_SCHEMA};
use crate::query::{memory, QuerySpec};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// `RwLock`-guarded [`Store`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    posts: RwLock<HashMap<Uuid, Post>>,
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn find_post(&self, id: Uuid) -> DomainResult<Option<Post>> {
        Ok(self.posts.read().await.get(&id).cloned())
    }

    async fn find_posts(&self, ids: &[Uuid]) -> DomainResult<Vec<Post>> {
        let posts = self.posts.read().await;
        Ok(ids.iter().filter_map(|id| posts.get(id).cloned()).collect())
    }

    async fn insert_post(&self, post: NewPost) -> DomainResult<Post> {
        let post = Post {
            id: Uuid::new_v4(),
            parent_id: post.parent_id,
            user_id: post.user_id,
            operand: post.operand,
            operation: post.operation,
            value: post.value,
            version: 0,
            created_at: Utc::now(),
        };

        self.posts.write().await.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update_post(&self, id: Uuid, patch: PostPatch) -> DomainResult<Option<Post>> {
        let mut posts = self.posts.write().await;

        Ok(posts.get_mut(&id).map(|post| {
            post.user_id = patch.user_id;
            post.operand = patch.operand;
            post.operation = patch.operation;
            post.value = patch.value;
            post.version += 1;
            post.clone()
        }))
    }

    async fn delete_post(&self, id: Uuid) -> DomainResult<bool> {
        Ok(self.posts.write().await.remove(&id).is_some())
    }

    async fn query_posts(&self, spec: &QuerySpec) -> DomainResult<Vec<Post>> {
        let posts: Vec<Post> = self.posts.read().await.values().cloned().collect();
        memory::run(&posts, spec, &POST_SCHEMA)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: Uuid) -> DomainResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_users(&self, ids: &[Uuid]) -> DomainResult<Vec<User>> {
        let users = self.users.read().await;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn find_user_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn insert_user(&self, user: NewUser) -> DomainResult<User> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.username == user.username) {
            return Err(DomainError::Conflict(USERNAME_TAKEN.to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: user.username,
            password_hash: user.password_hash,
            version: 0,
            created_at: Utc::now(),
        };

        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn query_users(&self, spec: &QuerySpec) -> DomainResult<Vec<User>> {
        let users: Vec<User> = self.users.read().await.values().cloned().collect();
        memory::run(&users, spec, &USER_SCHEMA)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> DomainResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arithmetic::Operation;

    fn root(user_id: Uuid, operand: f64) -> NewPost {
        NewPost {
            parent_id: None,
            user_id,
            operand,
            operation: None,
            value: operand,
        }
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let post = store.insert_post(root(owner, 5.0)).await.unwrap();
        assert_eq!(post.version, 0);

        let caller = Uuid::new_v4();
        let updated = store
            .update_post(
                post.id,
                PostPatch {
                    user_id: caller,
                    operand: 7.0,
                    operation: Some(Operation::Add),
                    value: 7.0,
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.version, 1);
        assert_eq!(updated.user_id, caller);
        assert_eq!(updated.created_at, post.created_at);
    }

    #[tokio::test]
    async fn test_update_missing_returns_none() {
        let store = MemoryStore::new();
        let patch = PostPatch {
            user_id: Uuid::new_v4(),
            operand: 1.0,
            operation: None,
            value: 1.0,
        };

        assert!(store.update_post(Uuid::new_v4(), patch).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let store = MemoryStore::new();
        let post = store.insert_post(root(Uuid::new_v4(), 1.0)).await.unwrap();

        assert!(store.delete_post(post.id).await.unwrap());
        assert!(!store.delete_post(post.id).await.unwrap());
        assert!(store.find_post(post.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_posts_skips_unknown() {
        let store = MemoryStore::new();
        let post = store.insert_post(root(Uuid::new_v4(), 1.0)).await.unwrap();

        let found = store.find_posts(&[post.id, Uuid::new_v4()]).await.unwrap();
        assert_eq!(found, vec![post]);
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = MemoryStore::new();
        let new_user = NewUser {
            username: "alice".to_string(),
            password_hash: "hash".to_string(),
        };

        store.insert_user(new_user.clone()).await.unwrap();
        let err = store.insert_user(new_user).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_query_users_by_username() {
        let store = MemoryStore::new();
        for name in ["alice", "bob"] {
            store
                .insert_user(NewUser {
                    username: name.to_string(),
                    password_hash: "hash".to_string(),
                })
                .await
                .unwrap();
        }

        let spec = QuerySpec::from_pairs(vec![("username".to_string(), "bob".to_string())]).unwrap();
        let users = store.query_users(&spec).await.unwrap();

        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "bob");
    }
}
