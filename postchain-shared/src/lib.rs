//! # Postchain Shared Library
//!
//! Domain core of the Postchain API: posts whose values are derived by
//! applying an arithmetic operation to their parent's value, the users who
//! own them, and the query translator that turns URL query strings into
//! store queries.
//!
//! ## Module Organization
//!
//! - `arithmetic`: the four operations and the value computation
//! - `models`: users and posts, their schemas and validation
//! - `query`: query-string translation and per-backend adapters
//! - `store`: storage traits with PostgreSQL and in-memory implementations
//! - `services`: post lifecycle and rendering
//! - `auth`: password hashing and JWTs
//! - `db`: connection pool and migrations
//! - `error`: domain error types

pub mod arithmetic;
pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod query;
pub mod services;
pub mod store;

/// Current version of the Postchain shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
