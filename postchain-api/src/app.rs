/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use postchain_api::{app::AppState, config::Config};
/// use postchain_shared::store::PgStore;
/// use sqlx::PgPool;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(Arc::new(PgStore::new(pool.clone())), config).with_pool(pool);
/// let app = postchain_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{
        auth::protect,
        rate_limit::{rate_limit_layer, RateLimiter},
        security::SecurityHeadersLayer,
    },
    routes,
};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Router,
};
use postchain_shared::store::Store;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Largest accepted request body
pub const BODY_LIMIT_BYTES: usize = 10 * 1024;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Post and user persistence
    pub store: Arc<dyn Store>,

    /// Application configuration
    pub config: Arc<Config>,

    /// Per-client limiter for `/api`
    pub rate_limiter: Arc<RateLimiter>,

    /// Pool behind the store, when it is PostgreSQL (health stats only)
    pub pool: Option<PgPool>,
}

impl AppState {
    /// Creates new application state
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let rate_limiter = RateLimiter::new(
            config.rate_limit.max_requests,
            Duration::from_secs(config.rate_limit.window_secs),
        );

        Self {
            store,
            config: Arc::new(config),
            rate_limiter: Arc::new(rate_limiter),
            pool: None,
        }
    }

    /// Attaches the connection pool so `/health` can report its stats
    pub fn with_pool(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                       # Health check (public)
/// └── /api/v1/                      # Rate limited
///     ├── /users/
///     │   ├── POST   /signup
///     │   ├── POST   /login
///     │   ├── GET    /logout
///     │   ├── GET    /me            # protected
///     │   └── GET    /
///     └── /posts/
///         ├── GET    /
///         ├── POST   /              # protected
///         ├── GET    /:id
///         ├── PATCH  /:id           # protected
///         └── DELETE /:id           # protected
/// ```
///
/// # Middleware Stack
///
/// Outermost first:
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Body limit (10 KB)
/// 5. Rate limit (`/api` only)
/// 6. Authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    let auth = || from_fn_with_state(state.clone(), protect);

    let user_routes = Router::new()
        .route("/signup", post(routes::users::signup))
        .route("/login", post(routes::users::login))
        .route("/logout", get(routes::users::logout))
        .route("/me", get(routes::users::me).route_layer(auth()))
        .route("/", get(routes::users::get_all_users));

    let post_routes = Router::new()
        .route(
            "/",
            get(routes::posts::get_all_posts)
                .merge(post(routes::posts::create_post).route_layer(auth())),
        )
        .route(
            "/:id",
            get(routes::posts::get_post).merge(
                patch(routes::posts::update_post)
                    .delete(routes::posts::delete_post)
                    .route_layer(auth()),
            ),
        );

    let api_routes = Router::new()
        .nest("/users", user_routes)
        .nest("/posts", post_routes)
        .layer(from_fn_with_state(state.clone(), rate_limit_layer));

    // A wildcard origin cannot carry credentials
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(Duration::from_secs(3600))
    };

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api/v1", api_routes)
        .fallback(routes::not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
