/// User and session endpoints
///
/// # Endpoints
///
/// - `POST /api/v1/users/signup` - Register and log in
/// - `POST /api/v1/users/login` - Log in
/// - `GET /api/v1/users/logout` - Clear the session cookie
/// - `GET /api/v1/users/me` - Current user (protected)
/// - `GET /api/v1/users` - List users through the query translator
///
/// Signup and login answer with the token in the body and in an `HttpOnly`
/// `jwt` cookie:
///
/// ```json
/// {
///   "status": "success",
///   "token": "eyJ...",
///   "data": { "user": { "id": "...", "username": "alice", "createdAt": "..." } }
/// }
/// ```

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiQuery},
    middleware::auth::{AuthUser, JWT_COOKIE},
    routes::Envelope,
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use postchain_shared::{
    auth::{jwt, password},
    error::DomainError,
    models::user::{validate_signup, NewUser, User, USER_SCHEMA},
    query::QuerySpec,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use validator::Validate;

/// Sent for a missing username or password on login
pub const MISSING_CREDENTIALS: &str = "Please provide username and password!";

/// Sent for an unknown username or a wrong password
pub const INCORRECT_CREDENTIALS: &str = "Incorrect username or password!";

/// Signup request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    #[validate(length(max = 50, message = "Username must be at most 50 characters"))]
    pub username: String,

    #[serde(default)]
    #[validate(length(max = 128, message = "Password must be at most 128 characters"))]
    pub password: String,

    #[serde(default)]
    pub password_confirm: String,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// `data` of an auth response
#[derive(Debug, Serialize)]
pub struct UserBody {
    pub user: User,
}

/// Signup and login response
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub status: &'static str,
    pub token: String,
    pub data: UserBody,
}

/// Issues a token for `user` and attaches it as the `jwt` cookie
fn send_token(
    state: &AppState,
    jar: CookieJar,
    user: User,
) -> ApiResult<(CookieJar, Json<AuthResponse>)> {
    let claims = jwt::Claims::new(
        user.id,
        chrono::Duration::days(state.config.jwt.expires_in_days),
    );
    let token = jwt::create_token(&claims, state.jwt_secret())?;

    let cookie = Cookie::build((JWT_COOKIE, token.clone()))
        .http_only(true)
        .secure(state.config.api.production)
        .path("/")
        .max_age(time::Duration::days(state.config.jwt.cookie_expires_in_days));

    Ok((
        jar.add(cookie),
        Json(AuthResponse {
            status: "success",
            token,
            data: UserBody { user },
        }),
    ))
}

/// Register a new user
///
/// # Errors
///
/// - `400 Bad Request`: missing or invalid fields, every violation listed
/// - `409 Conflict`: username taken
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<SignupRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let username = validate_signup(&req.username, &req.password, &req.password_confirm)
        .map_err(DomainError::Validation)?;

    let password_hash = password::hash_password(&req.password)?;

    let user = state
        .store
        .insert_user(NewUser {
            username,
            password_hash,
        })
        .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User signed up");

    let (jar, body) = send_token(&state, jar, user)?;
    Ok((StatusCode::CREATED, jar, body))
}

/// Log in with username and password
///
/// # Errors
///
/// - `400 Bad Request`: username or password missing
/// - `401 Unauthorized`: unknown user or wrong password
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let (username, candidate) = match (req.username, req.password) {
        (Some(u), Some(p)) if !u.trim().is_empty() && !p.is_empty() => (u, p),
        _ => return Err(ApiError::BadRequest(MISSING_CREDENTIALS.to_string())),
    };

    let user = state
        .store
        .find_user_by_username(username.trim())
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INCORRECT_CREDENTIALS.to_string()))?;

    if !password::verify_password(&candidate, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login rejected");
        return Err(ApiError::Unauthorized(INCORRECT_CREDENTIALS.to_string()));
    }

    tracing::info!(user_id = %user.id, "User logged in");
    send_token(&state, jar, user)
}

/// Clear the session cookie
///
/// Always answers with an expired `jwt` cookie, whether or not the request
/// carried one.
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let mut cookie = Cookie::build((JWT_COOKIE, "")).path("/").build();
    cookie.make_removal();

    (jar.add(cookie), Json(json!({ "status": "success" })))
}

/// Current user
///
/// The response must not be cached by intermediaries or the browser.
pub async fn me(Extension(AuthUser(user)): Extension<AuthUser>) -> impl IntoResponse {
    (
        [
            (header::CACHE_CONTROL, "no-store"),
            (header::PRAGMA, "no-cache"),
        ],
        Json(Envelope::one(UserBody { user })),
    )
}

/// List users
///
/// Accepts the same filter, `sort`, `fields`, `page` and `limit` parameters
/// as the post listing.
///
/// # Errors
///
/// - `400 Bad Request`: unknown field or untyped value in the query
pub async fn get_all_users(
    State(state): State<AppState>,
    ApiQuery(pairs): ApiQuery<Vec<(String, String)>>,
) -> ApiResult<Json<Envelope<Vec<JsonValue>>>> {
    let spec = QuerySpec::from_pairs(pairs)?;
    let users = state.store.query_users(&spec).await?;

    let documents = users
        .iter()
        .map(|user| match serde_json::to_value(user) {
            Ok(JsonValue::Object(mut document)) => {
                spec.projection.apply(&mut document, &USER_SCHEMA);
                Ok(JsonValue::Object(document))
            }
            Ok(_) => Err(ApiError::InternalError(format!("user {} did not render", user.id))),
            Err(e) => Err(ApiError::InternalError(e.to_string())),
        })
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(Json(Envelope::many(documents)))
}
