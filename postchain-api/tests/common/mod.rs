/// Common test utilities for integration tests
///
/// Builds the full router over an in-memory store, so the suites run without
/// PostgreSQL:
/// - App construction with test configuration
/// - Request helpers returning status, headers and parsed JSON
/// - User signup shortcuts

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use postchain_api::app::{build_router, AppState};
use postchain_api::config::Config;
use postchain_shared::store::MemoryStore;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Parsed response
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Test context holding the router and its store
pub struct TestContext {
    pub app: axum::Router,
    pub store: Arc<MemoryStore>,
}

impl TestContext {
    /// Creates a context with default settings
    pub fn new() -> Self {
        Self::with_env(&[])
    }

    /// Creates a context with extra configuration variables
    pub fn with_env(overrides: &[(&str, &str)]) -> Self {
        let mut vars: HashMap<String, String> = [
            ("JWT_SECRET", JWT_SECRET),
            ("DATABASE_URL", "postgresql://unused/test"),
        ]
        .iter()
        .chain(overrides.iter())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        vars.entry("RATE_LIMIT_MAX".to_string())
            .or_insert_with(|| "1000".to_string());

        let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();
        let store = Arc::new(MemoryStore::new());
        let app = build_router(AppState::new(store.clone(), config));

        Self { app, store }
    }

    /// Sends a request and parses the JSON body (`Null` when empty)
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send_request(request).await
    }

    /// Sends a prepared request
    pub async fn send_request(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(Method::GET, uri, None, token).await
    }

    /// Signs a user up and returns their token
    pub async fn signup(&self, username: &str) -> String {
        let response = self
            .send(
                Method::POST,
                "/api/v1/users/signup",
                Some(json!({
                    "username": username,
                    "password": "password123",
                    "passwordConfirm": "password123"
                })),
                None,
            )
            .await;

        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["token"].as_str().unwrap().to_string()
    }

    /// Creates a post and returns the stored document
    pub async fn create_post(&self, token: &str, body: Value) -> Value {
        let response = self
            .send(Method::POST, "/api/v1/posts", Some(body), Some(token))
            .await;

        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["data"]["data"].clone()
    }
}
