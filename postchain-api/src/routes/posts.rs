/// Post endpoints
///
/// # Endpoints
///
/// - `GET /api/v1/posts` - List posts (filter, sort, fields, page, limit)
/// - `POST /api/v1/posts` - Create a post (protected)
/// - `GET /api/v1/posts/:id` - One post
/// - `PATCH /api/v1/posts/:id` - Update a post (protected)
/// - `DELETE /api/v1/posts/:id` - Delete a post (protected)
///
/// Reads render `parentId` and `userId` as the referenced post and user;
/// writes return the stored post with plain IDs.
///
/// # Example
///
/// ```text
/// POST /api/v1/posts
/// Authorization: Bearer <jwt_token>
/// Content-Type: application/json
///
/// { "parentId": "6f1c...", "operation": "*", "operand": 2 }
/// ```
///
/// ```json
/// {
///   "status": "success",
///   "data": {
///     "data": {
///       "id": "9a7e...",
///       "parentId": "6f1c...",
///       "userId": "c2d4...",
///       "operand": 2.0,
///       "operation": "*",
///       "value": 16.0,
///       "createdAt": "2025-01-01T00:00:00Z"
///     }
///   }
/// }
/// ```

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath, ApiQuery},
    middleware::auth::AuthUser,
    routes::Envelope,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use postchain_shared::{
    models::post::{Post, PostDraft},
    query::{Projection, QuerySpec},
    services::{Expand, PostService},
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

type DocumentResponse = Json<Envelope<JsonValue>>;

/// Renders a freshly written post without expanding its references
async fn render_written(service: &PostService<'_>, post: Post) -> ApiResult<JsonValue> {
    let mut rendered = service
        .render(&[post], &Projection::Default, Expand::NONE)
        .await?;

    rendered
        .pop()
        .ok_or_else(|| ApiError::InternalError("post did not render".to_string()))
}

/// List posts
///
/// # Errors
///
/// - `400 Bad Request`: unknown field, untyped value or mixed projection
pub async fn get_all_posts(
    State(state): State<AppState>,
    ApiQuery(pairs): ApiQuery<Vec<(String, String)>>,
) -> ApiResult<Json<Envelope<Vec<JsonValue>>>> {
    let spec = QuerySpec::from_pairs(pairs)?;
    let posts = PostService::new(state.store.as_ref())
        .get_all_posts(&spec, Expand::ALL)
        .await?;

    Ok(Json(Envelope::many(posts)))
}

/// Create a post owned by the caller
///
/// # Errors
///
/// - `400 Bad Request`: missing operand, child without operation, division
///   by zero, non-finite result
/// - `404 Not Found`: parent does not exist
pub async fn create_post(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    ApiJson(draft): ApiJson<PostDraft>,
) -> ApiResult<(StatusCode, DocumentResponse)> {
    let service = PostService::new(state.store.as_ref());
    let post = service.create_post(user.id, draft).await?;

    let document = render_written(&service, post).await?;
    Ok((StatusCode::CREATED, Json(Envelope::one(document))))
}

/// Get one post with its parent and owner
///
/// # Errors
///
/// - `400 Bad Request`: malformed ID
/// - `404 Not Found`: no such post
pub async fn get_post(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<DocumentResponse> {
    let document = PostService::new(state.store.as_ref())
        .get_post(id, Expand::ALL)
        .await?;

    Ok(Json(Envelope::one(document)))
}

/// Update a post's operand and operation
///
/// The caller becomes the owner. `parentId` in the body is ignored.
///
/// # Errors
///
/// - `400 Bad Request`: merged fields break a post invariant
/// - `404 Not Found`: post or its parent no longer exists
pub async fn update_post(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(draft): ApiJson<PostDraft>,
) -> ApiResult<DocumentResponse> {
    let service = PostService::new(state.store.as_ref());
    let post = service.update_post(id, user.id, draft).await?;

    let document = render_written(&service, post).await?;
    Ok(Json(Envelope::one(document)))
}

/// Delete a post; its children are kept
///
/// # Errors
///
/// - `404 Not Found`: no such post
pub async fn delete_post(
    State(state): State<AppState>,
    Extension(_caller): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    PostService::new(state.store.as_ref()).delete_post(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
