/// PostgreSQL store
///
/// Every operation is one statement. Updates use `UPDATE ... RETURNING` so
/// the version bump and the read-back happen atomically per row.

use super::{PostStore, Store, UserStore, USERNAME_TAKEN};
use crate::db::pool::health_check;
use crate::error::{DomainError, DomainResult};
use crate::models::post::{NewPost, Post, PostPatch, PostRow, POST_SCHEMA};
use crate::models::user::{NewUser, User, USER_SCHEMA};
use crate::query::{postgres::build_select, QuerySpec};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

/// sqlx-backed [`Store`]
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wraps an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool, for shutdown and stats
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn decode_posts(rows: Vec<PostRow>) -> DomainResult<Vec<Post>> {
    rows.into_iter().map(decode_post).collect()
}

fn decode_post(row: PostRow) -> DomainResult<Post> {
    let id = row.id;
    Post::try_from(row).map_err(|e| DomainError::CorruptRecord(format!("post {}: {}", id, e)))
}

#[async_trait]
impl PostStore for PgStore {
    async fn find_post(&self, id: Uuid) -> DomainResult<Option<Post>> {
        let sql = format!("SELECT {} FROM posts WHERE id = $1", POST_SCHEMA.select_list());

        sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(decode_post)
            .transpose()
    }

    async fn find_posts(&self, ids: &[Uuid]) -> DomainResult<Vec<Post>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {} FROM posts WHERE id = ANY($1)",
            POST_SCHEMA.select_list()
        );

        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        decode_posts(rows)
    }

    async fn insert_post(&self, post: NewPost) -> DomainResult<Post> {
        let sql = format!(
            "INSERT INTO posts (id, parent_id, user_id, operand, operation, value)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            POST_SCHEMA.select_list()
        );

        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(post.parent_id)
            .bind(post.user_id)
            .bind(post.operand)
            .bind(post.operation.map(|o| o.as_str()))
            .bind(post.value)
            .fetch_one(&self.pool)
            .await?;

        debug!(post_id = %row.id, "Inserted post");
        decode_post(row)
    }

    async fn update_post(&self, id: Uuid, patch: PostPatch) -> DomainResult<Option<Post>> {
        let sql = format!(
            "UPDATE posts
             SET user_id = $2, operand = $3, operation = $4, value = $5, version = version + 1
             WHERE id = $1
             RETURNING {}",
            POST_SCHEMA.select_list()
        );

        sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .bind(patch.user_id)
            .bind(patch.operand)
            .bind(patch.operation.map(|o| o.as_str()))
            .bind(patch.value)
            .fetch_optional(&self.pool)
            .await?
            .map(decode_post)
            .transpose()
    }

    async fn delete_post(&self, id: Uuid) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn query_posts(&self, spec: &QuerySpec) -> DomainResult<Vec<Post>> {
        let mut builder = build_select(spec, &POST_SCHEMA)?;
        debug!(sql = builder.sql(), "Querying posts");

        let rows = builder
            .build_query_as::<PostRow>()
            .fetch_all(&self.pool)
            .await?;

        decode_posts(rows)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user(&self, id: Uuid) -> DomainResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_SCHEMA.select_list());

        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_users(&self, ids: &[Uuid]) -> DomainResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {} FROM users WHERE id = ANY($1)",
            USER_SCHEMA.select_list()
        );

        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_user_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_SCHEMA.select_list()
        );

        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_user(&self, user: NewUser) -> DomainResult<User> {
        let sql = format!(
            "INSERT INTO users (id, username, password_hash)
             VALUES ($1, $2, $3)
             RETURNING {}",
            USER_SCHEMA.select_list()
        );

        let result = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.username)
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(user) => {
                debug!(user_id = %user.id, "Inserted user");
                Ok(user)
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(DomainError::Conflict(USERNAME_TAKEN.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn query_users(&self, spec: &QuerySpec) -> DomainResult<Vec<User>> {
        let mut builder = build_select(spec, &USER_SCHEMA)?;
        debug!(sql = builder.sql(), "Querying users");

        Ok(builder
            .build_query_as::<User>()
            .fetch_all(&self.pool)
            .await?)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> DomainResult<()> {
        Ok(health_check(&self.pool).await?)
    }
}
