/// Storage contract
///
/// The core talks to persistence only through these traits. Every method is a
/// single atomic store call; there are no multi-statement transactions, so an
/// operation either fully happens or does not happen at all.
///
/// # Implementations
///
/// - [`PgStore`]: PostgreSQL via sqlx
/// - [`MemoryStore`]: `RwLock`-guarded maps, for tests and local demos
///
/// # Example
///
/// ```
/// use postchain_shared::models::post::NewPost;
/// use postchain_shared::store::{MemoryStore, PostStore};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let post = store
///     .insert_post(NewPost {
///         parent_id: None,
///         user_id: Uuid::new_v4(),
///         operand: 5.0,
///         operation: None,
///         value: 5.0,
///     })
///     .await?;
///
/// assert_eq!(store.find_post(post.id).await?, Some(post));
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::DomainResult;
use crate::models::post::{NewPost, Post, PostPatch};
use crate::models::user::{NewUser, User};
use crate::query::QuerySpec;
use async_trait::async_trait;
use uuid::Uuid;

/// Post persistence
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Looks up a post by ID
    async fn find_post(&self, id: Uuid) -> DomainResult<Option<Post>>;

    /// Looks up several posts at once; unknown IDs are skipped
    async fn find_posts(&self, ids: &[Uuid]) -> DomainResult<Vec<Post>>;

    /// Inserts a post with `version = 0` and `created_at = now`
    async fn insert_post(&self, post: NewPost) -> DomainResult<Post>;

    /// Replaces the mutable fields and increments `version`
    ///
    /// Returns `None` if the post no longer exists.
    async fn update_post(&self, id: Uuid, patch: PostPatch) -> DomainResult<Option<Post>>;

    /// Physically removes a post, returning whether it existed
    ///
    /// Children are left untouched.
    async fn delete_post(&self, id: Uuid) -> DomainResult<bool>;

    /// Runs a translated query against the `posts` collection
    async fn query_posts(&self, spec: &QuerySpec) -> DomainResult<Vec<Post>>;
}

/// User persistence
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Looks up a user by ID
    async fn find_user(&self, id: Uuid) -> DomainResult<Option<User>>;

    /// Looks up several users at once; unknown IDs are skipped
    async fn find_users(&self, ids: &[Uuid]) -> DomainResult<Vec<User>>;

    /// Looks up a user by exact (already trimmed) username
    async fn find_user_by_username(&self, username: &str) -> DomainResult<Option<User>>;

    /// Inserts a user
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Conflict` if the username is taken.
    async fn insert_user(&self, user: NewUser) -> DomainResult<User>;

    /// Runs a translated query against the `users` collection
    async fn query_users(&self, spec: &QuerySpec) -> DomainResult<Vec<User>>;
}

/// Everything the application needs from persistence
#[async_trait]
pub trait Store: PostStore + UserStore {
    /// Checks that the backend is reachable
    async fn ping(&self) -> DomainResult<()>;
}

/// Message used when a username is already registered
pub const USERNAME_TAKEN: &str = "Username is already taken!";
