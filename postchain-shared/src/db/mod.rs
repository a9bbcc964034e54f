/// Database plumbing
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool with health check and stats
/// - `migrations`: embedded schema migrations
///
/// Queries themselves live in [`crate::store::postgres`].

pub mod migrations;
pub mod pool;
