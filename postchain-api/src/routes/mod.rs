/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `users`: Signup, login, logout, current user and user listing
/// - `posts`: Post CRUD and listing
///
/// Successful responses use the envelope
/// `{"status": "success", "data": {"data": ...}}`; lists add `results`.

pub mod health;
pub mod posts;
pub mod users;

use crate::error::ApiError;
use axum::http::Uri;
use serde::Serialize;

/// Inner `data` object of the success envelope
#[derive(Debug, Serialize)]
pub struct DataBody<T> {
    pub data: T,
}

/// Success envelope
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<usize>,

    pub data: DataBody<T>,
}

impl<T> Envelope<T> {
    /// Wraps a single document
    pub fn one(data: T) -> Self {
        Self {
            status: "success",
            results: None,
            data: DataBody { data },
        }
    }
}

impl<T> Envelope<Vec<T>> {
    /// Wraps a list, counting it
    pub fn many(data: Vec<T>) -> Self {
        Self {
            status: "success",
            results: Some(data.len()),
            data: DataBody { data },
        }
    }
}

/// Fallback for unknown routes
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("Can't find {} on this server!", uri.path()))
}
