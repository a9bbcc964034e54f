/// Post service
///
/// Implements the post lifecycle on top of a [`Store`]:
///
/// ```text
/// create/update: draft -> validate -> resolve parent -> compute -> persist
/// read:          store query -> projection -> expand parent/owner -> JSON
/// delete:        physical removal, no cascade
/// ```
///
/// # Expansion
///
/// Reads can replace `parentId` and `userId` with snapshots of the referenced
/// post and user. Snapshots drop `version`, and user snapshots never carry
/// password material. A dangling reference renders as `null`. A relation the
/// projection removed is not expanded.
///
/// # Example
///
/// ```
/// use postchain_shared::arithmetic::Operation;
/// use postchain_shared::models::post::PostDraft;
/// use postchain_shared::services::PostService;
/// use postchain_shared::store::MemoryStore;
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let service = PostService::new(&store);
/// let owner = Uuid::new_v4();
///
/// let root = service
///     .create_post(owner, PostDraft { operand: Some(5.0), ..Default::default() })
///     .await?;
/// let child = service
///     .create_post(
///         owner,
///         PostDraft {
///             operand: Some(3.0),
///             operation: Some(Operation::Add),
///             parent_id: Some(root.id),
///         },
///     )
///     .await?;
///
/// assert_eq!(child.value, 8.0);
/// # Ok(())
/// # }
/// ```

use crate::error::{DomainError, DomainResult};
use crate::models::post::{NewPost, Post, PostDraft, PostPatch, ValidPost, POST_SCHEMA};
use crate::models::user::User;
use crate::query::{Projection, QuerySpec};
use crate::store::Store;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Message for a missing post
pub const POST_NOT_FOUND: &str = "No document found with that ID";

/// Message for a missing parent
pub const PARENT_NOT_FOUND: &str = "Parent post not found!";

/// Relations to expand when rendering posts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Expand {
    /// Replace `parentId` with the parent post
    pub parent: bool,

    /// Replace `userId` with the owning user
    pub owner: bool,
}

impl Expand {
    /// Render references as plain IDs
    pub const NONE: Expand = Expand {
        parent: false,
        owner: false,
    };

    /// Expand every relation
    pub const ALL: Expand = Expand {
        parent: true,
        owner: true,
    };
}

/// Post operations over a store
pub struct PostService<'a> {
    store: &'a dyn Store,
}

impl<'a> PostService<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Validates and persists a new post owned by `owner_id`
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation` if the draft breaks a post invariant or the
    ///   computed value is not finite
    /// - `DomainError::NotFound` if the parent does not exist; nothing is
    ///   persisted in that case
    pub async fn create_post(&self, owner_id: Uuid, draft: PostDraft) -> DomainResult<Post> {
        let valid = draft.validate().map_err(DomainError::Validation)?;
        let value = self.derive_value(&valid).await?;

        let post = self
            .store
            .insert_post(NewPost {
                parent_id: valid.parent_id(),
                user_id: owner_id,
                operand: valid.operand(),
                operation: valid.operation(),
                value,
            })
            .await?;

        info!(
            post_id = %post.id,
            parent_id = ?post.parent_id,
            value = post.value,
            "Post created"
        );

        Ok(post)
    }

    /// Updates a post's operand and/or operation and recomputes its value
    ///
    /// Fields absent from the draft keep their stored values. The parent is
    /// always the stored one; a `parentId` in the draft is ignored. The caller
    /// becomes the owner and the version is incremented.
    ///
    /// Descendants are not recomputed.
    ///
    /// # Errors
    ///
    /// - `DomainError::NotFound` if the post or its parent no longer exists
    /// - `DomainError::Validation` if the merged post is invalid
    pub async fn update_post(
        &self,
        id: Uuid,
        caller_id: Uuid,
        draft: PostDraft,
    ) -> DomainResult<Post> {
        let stored = self
            .store
            .find_post(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(POST_NOT_FOUND.to_string()))?;

        if draft.parent_id.is_some() && draft.parent_id != stored.parent_id {
            debug!(post_id = %id, "Ignoring parentId in update");
        }

        let merged = PostDraft {
            operand: draft.operand.or(Some(stored.operand)),
            operation: draft.operation.or(stored.operation),
            parent_id: stored.parent_id,
        };

        let valid = merged.validate().map_err(DomainError::Validation)?;
        let value = self.derive_value(&valid).await?;

        let post = self
            .store
            .update_post(
                id,
                PostPatch {
                    user_id: caller_id,
                    operand: valid.operand(),
                    operation: valid.operation(),
                    value,
                },
            )
            .await?
            .ok_or_else(|| DomainError::NotFound(POST_NOT_FOUND.to_string()))?;

        info!(post_id = %post.id, version = post.version, value = post.value, "Post updated");

        Ok(post)
    }

    /// Loads and renders one post
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the post does not exist.
    pub async fn get_post(&self, id: Uuid, expand: Expand) -> DomainResult<JsonValue> {
        let post = self
            .store
            .find_post(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(POST_NOT_FOUND.to_string()))?;

        let mut rendered = self
            .render(std::slice::from_ref(&post), &Projection::Default, expand)
            .await?;

        rendered
            .pop()
            .ok_or_else(|| DomainError::CorruptRecord(format!("post {} did not render", id)))
    }

    /// Runs a translated query and renders the matching posts
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidQuery` if the spec names unknown fields or
    /// carries untyped values.
    pub async fn get_all_posts(
        &self,
        spec: &QuerySpec,
        expand: Expand,
    ) -> DomainResult<Vec<JsonValue>> {
        let posts = self.store.query_posts(spec).await?;
        debug!(count = posts.len(), "Posts queried");

        self.render(&posts, &spec.projection, expand).await
    }

    /// Physically deletes a post; children keep their dangling `parentId`
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the post does not exist.
    pub async fn delete_post(&self, id: Uuid) -> DomainResult<()> {
        if !self.store.delete_post(id).await? {
            return Err(DomainError::NotFound(POST_NOT_FOUND.to_string()));
        }

        info!(post_id = %id, "Post deleted");
        Ok(())
    }

    /// Renders posts as JSON documents, applying projection then expansion
    ///
    /// Parents and owners are fetched in one batch each.
    pub async fn render(
        &self,
        posts: &[Post],
        projection: &Projection,
        expand: Expand,
    ) -> DomainResult<Vec<JsonValue>> {
        let expand = Expand {
            parent: expand.parent && projection.keeps("parentId", &POST_SCHEMA),
            owner: expand.owner && projection.keeps("userId", &POST_SCHEMA),
        };

        let parents: HashMap<Uuid, Post> = if expand.parent {
            let ids = unique(posts.iter().filter_map(|p| p.parent_id));
            self.store
                .find_posts(&ids)
                .await?
                .into_iter()
                .map(|p| (p.id, p))
                .collect()
        } else {
            HashMap::new()
        };

        let owners: HashMap<Uuid, User> = if expand.owner {
            let ids = unique(posts.iter().map(|p| p.user_id));
            self.store
                .find_users(&ids)
                .await?
                .into_iter()
                .map(|u| (u.id, u))
                .collect()
        } else {
            HashMap::new()
        };

        posts
            .iter()
            .map(|post| {
                let mut document = to_document(post)?;
                projection.apply(&mut document, &POST_SCHEMA);

                if let (true, Some(parent_id)) = (expand.parent, post.parent_id) {
                    document.insert("parentId".to_string(), snapshot(parents.get(&parent_id))?);
                }

                if expand.owner {
                    document.insert("userId".to_string(), snapshot(owners.get(&post.user_id))?);
                }

                Ok(JsonValue::Object(document))
            })
            .collect()
    }

    async fn derive_value(&self, valid: &ValidPost) -> DomainResult<f64> {
        let parent_value = match valid.parent_id() {
            Some(parent_id) => {
                self.store
                    .find_post(parent_id)
                    .await?
                    .ok_or_else(|| DomainError::NotFound(PARENT_NOT_FOUND.to_string()))?
                    .value
            }
            None => valid.operand(),
        };

        let value = valid.derive_value(parent_value);
        if !value.is_finite() {
            return Err(DomainError::invalid(
                "value",
                "Computed value must be a finite number!",
            ));
        }

        Ok(value)
    }
}

fn unique(ids: impl Iterator<Item = Uuid>) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = ids.collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn to_document<T: Serialize>(entity: &T) -> DomainResult<Map<String, JsonValue>> {
    match serde_json::to_value(entity) {
        Ok(JsonValue::Object(document)) => Ok(document),
        Ok(other) => Err(DomainError::CorruptRecord(format!(
            "expected an object, got {}",
            other
        ))),
        Err(e) => Err(DomainError::CorruptRecord(e.to_string())),
    }
}

fn snapshot<T: Serialize>(entity: Option<&T>) -> DomainResult<JsonValue> {
    match entity {
        Some(entity) => {
            let mut document = to_document(entity)?;
            document.remove("version");
            Ok(JsonValue::Object(document))
        }
        None => Ok(JsonValue::Null),
    }
}
