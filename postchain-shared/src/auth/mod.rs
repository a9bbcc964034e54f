/// Authentication primitives
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: HS256 token issuance and validation
///
/// Request-level authentication (extracting tokens from headers or cookies
/// and loading the user) lives in the API crate's middleware.

pub mod jwt;
pub mod password;
