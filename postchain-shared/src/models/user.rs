/// User model
///
/// Users own posts and authenticate with a username and password. The
/// password is stored only as an Argon2id hash and is never serialized.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     username TEXT NOT NULL,
///     password_hash TEXT NOT NULL,
///     version INTEGER NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use crate::auth::password::MIN_PASSWORD_LENGTH;
use crate::error::Violation;
use crate::query::schema::{FieldDef, FieldKind, Schema};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Queryable fields of the `users` collection
///
/// The password hash is loaded with each row but can be neither filtered,
/// sorted nor selected.
pub const USER_SCHEMA: Schema = Schema {
    collection: "users",
    fields: &[
        FieldDef::new("id", "id", FieldKind::Uuid),
        FieldDef::new("username", "username", FieldKind::Text),
        FieldDef::internal("version", "version", FieldKind::Integer),
        FieldDef::new("createdAt", "created_at", FieldKind::Timestamp),
    ],
    hidden_columns: &["password_hash"],
};

/// Stored user account
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Login name, stored trimmed
    pub username: String,

    /// Argon2id password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Internal version metadata
    pub version: i32,

    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Input for inserting a user
///
/// Holds the hash, never the plaintext password.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
}

/// Checks signup fields, reporting every violation
///
/// Returns the trimmed username on success. The confirmation is compared and
/// then dropped; it is never persisted.
///
/// # Example
///
/// ```
/// use postchain_shared::models::user::validate_signup;
///
/// assert_eq!(validate_signup("  alice ", "password1", "password1").unwrap(), "alice");
/// assert!(validate_signup("alice", "password1", "password2").is_err());
/// ```
pub fn validate_signup(
    username: &str,
    password: &str,
    password_confirm: &str,
) -> Result<String, Vec<Violation>> {
    let mut violations = Vec::new();
    let username = username.trim();

    if username.is_empty() {
        violations.push(Violation::new("username", "Please provide a username!"));
    }

    if password.is_empty() {
        violations.push(Violation::new("password", "Please provide a password!"));
    } else if password.chars().count() < MIN_PASSWORD_LENGTH {
        violations.push(Violation::new(
            "password",
            format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH),
        ));
    }

    if password_confirm.is_empty() {
        violations.push(Violation::new("passwordConfirm", "Please confirm your password!"));
    } else if password_confirm != password {
        violations.push(Violation::new("passwordConfirm", "Passwords don't match!"));
    }

    if violations.is_empty() {
        Ok(username.to_string())
    } else {
        Err(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            version: 0,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("password"));
        assert!(json.contains("\"username\":\"alice\""));
    }

    #[test]
    fn test_signup_blank_username() {
        let violations = validate_signup("   ", "password1", "password1").unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "username");
    }

    #[test]
    fn test_signup_short_password() {
        let violations = validate_signup("bob", "short", "short").unwrap_err();
        assert_eq!(violations[0].field, "password");
        assert!(violations[0].message.contains("at least 8"));
    }

    #[test]
    fn test_signup_mismatch() {
        let violations = validate_signup("bob", "password1", "password2").unwrap_err();
        assert_eq!(violations[0].field, "passwordConfirm");
        assert_eq!(violations[0].message, "Passwords don't match!");
    }

    #[test]
    fn test_signup_everything_missing() {
        let violations = validate_signup("", "", "").unwrap_err();
        assert_eq!(violations.len(), 3);
    }
}
