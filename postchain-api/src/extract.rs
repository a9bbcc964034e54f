/// Extractors that reject with [`ApiError`]
///
/// axum's own `Json` and `Query` answer malformed input with plain-text
/// bodies. These wrappers route the rejection through `ApiError` so every
/// client error uses the JSON error envelope.

use crate::error::ApiError;
use axum::extract::{FromRequest, FromRequestParts};

/// `axum::Json` with an `ApiError` rejection
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Path` with an `ApiError` rejection
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// `axum::extract::Query` with an `ApiError` rejection
///
/// Extracting `Vec<(String, String)>` keeps every pair in request order,
/// which the query translator needs to apply last-value-wins.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);
