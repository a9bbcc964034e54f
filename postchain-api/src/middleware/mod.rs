/// Middleware modules for the API server
///
/// - `auth`: bearer/cookie JWT protection of write routes
/// - `rate_limit`: per-client token bucket on `/api`
/// - `security`: hardening response headers

pub mod auth;
pub mod rate_limit;
pub mod security;
