/// Route protection
///
/// Write routes and `/users/me` sit behind [`protect`]. It reads a JWT from
/// `Authorization: Bearer <token>` or, failing that, the `jwt` cookie,
/// validates it, reloads the user and injects [`AuthUser`] into the request
/// extensions for handlers to pick up with `Extension<AuthUser>`.
///
/// # Errors
///
/// All failures are 401:
///
/// - no token in header or cookie
/// - bad signature, wrong issuer, expired token
/// - the user was deleted after the token was issued

use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use postchain_shared::{auth::jwt, models::user::User};

/// Name of the session cookie
pub const JWT_COOKIE: &str = "jwt";

/// Sent when neither header nor cookie carries a token
pub const NOT_LOGGED_IN: &str = "You are not logged in! Please log in to get access.";

/// Sent when the token's subject no longer exists
pub const USER_GONE: &str = "The user belonging to this token does no longer exist.";

/// Authenticated caller, available to protected handlers
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// Pulls the raw token out of the request, header first
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(JWT_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}

/// Authentication middleware
pub async fn protect(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers())
        .ok_or_else(|| ApiError::Unauthorized(NOT_LOGGED_IN.to_string()))?;

    let claims = jwt::validate_token(&token, state.jwt_secret())?;

    let user = state
        .store
        .find_user(claims.sub)
        .await?
        .ok_or_else(|| {
            tracing::debug!(user_id = %claims.sub, "Token subject no longer exists");
            ApiError::Unauthorized(USER_GONE.to_string())
        })?;

    tracing::debug!(user_id = %user.id, "Request authenticated");
    request.extensions_mut().insert(AuthUser(user));

    Ok(next.run(request).await)
}
