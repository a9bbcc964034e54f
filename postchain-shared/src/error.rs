/// Domain error types
///
/// Every core operation (post service, query translation, stores) returns
/// `DomainResult<T>`. The HTTP layer maps these onto status codes; nothing in
/// this crate knows about HTTP.

use serde::{Deserialize, Serialize};

/// Result alias for core operations
pub type DomainResult<T> = Result<T, DomainError>;

/// A single validation failure on an input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Field that failed validation (wire name, e.g. `operand`)
    pub field: String,

    /// Human-readable message
    pub message: String,
}

impl Violation {
    /// Creates a violation for `field`
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error type for core operations
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// Input violated one or more entity invariants
    #[error("Validation failed: {}", join_messages(.0))]
    Validation(Vec<Violation>),

    /// Referenced entity does not exist
    #[error("{0}")]
    NotFound(String),

    /// Write would violate a uniqueness constraint
    #[error("{0}")]
    Conflict(String),

    /// Query string could not be translated for the target collection
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored data could not be decoded into an entity
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),
}

impl DomainError {
    /// Shorthand for a single-field validation failure
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::Validation(vec![Violation::new(field, message)])
    }
}

fn join_messages(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.message.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_joins_messages() {
        let err = DomainError::Validation(vec![
            Violation::new("operand", "A post must have an operand!"),
            Violation::new("operation", "A post must have an operation!"),
        ]);

        assert_eq!(
            err.to_string(),
            "Validation failed: A post must have an operand! A post must have an operation!"
        );
    }
}
