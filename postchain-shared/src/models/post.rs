/// Post model and validation
///
/// A post is a node in a forest of computation chains. Roots carry their
/// operand as value; children derive their value from the parent's stored
/// value through the arithmetic engine.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE posts (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     parent_id UUID,
///     user_id UUID NOT NULL,
///     operand DOUBLE PRECISION NOT NULL,
///     operation TEXT CHECK (operation IN ('+', '-', '*', '/')),
///     value DOUBLE PRECISION NOT NULL,
///     version INTEGER NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// `parent_id` deliberately has no foreign key: deleting a parent leaves its
/// children in place with a dangling reference.
///
/// # Staleness
///
/// A child's value is computed once, at write time, from the parent's value at
/// that moment. Updating a parent does not recompute its descendants.

use crate::arithmetic::{compute, Operation};
use crate::error::Violation;
use crate::query::schema::{FieldDef, FieldKind, Schema};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Queryable fields of the `posts` collection
pub const POST_SCHEMA: Schema = Schema {
    collection: "posts",
    fields: &[
        FieldDef::new("id", "id", FieldKind::Uuid),
        FieldDef::new("parentId", "parent_id", FieldKind::Uuid),
        FieldDef::new("userId", "user_id", FieldKind::Uuid),
        FieldDef::new("operand", "operand", FieldKind::Number),
        FieldDef::new("operation", "operation", FieldKind::Text),
        FieldDef::new("value", "value", FieldKind::Number),
        FieldDef::internal("version", "version", FieldKind::Integer),
        FieldDef::new("createdAt", "created_at", FieldKind::Timestamp),
    ],
    hidden_columns: &[],
};

/// Stored post
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Unique post ID
    pub id: Uuid,

    /// Parent post, absent for roots
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,

    /// Owning user
    pub user_id: Uuid,

    /// Operand combined with the parent's value
    pub operand: f64,

    /// Operation applied to the parent's value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,

    /// Derived value
    pub value: f64,

    /// Internal version metadata, bumped on every update
    pub version: i32,

    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Whether this post starts a chain
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Raw `posts` row; `operation` is decoded in `TryFrom`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub user_id: Uuid,
    pub operand: f64,
    pub operation: Option<String>,
    pub value: f64,
    pub version: i32,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PostRow> for Post {
    type Error = crate::arithmetic::UnknownOperation;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        Ok(Post {
            id: row.id,
            parent_id: row.parent_id,
            user_id: row.user_id,
            operand: row.operand,
            operation: row.operation.map(Operation::try_from).transpose()?,
            value: row.value,
            version: row.version,
            created_at: row.created_at,
        })
    }
}

/// Input for inserting a post whose value is already derived
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub parent_id: Option<Uuid>,
    pub user_id: Uuid,
    pub operand: f64,
    pub operation: Option<Operation>,
    pub value: f64,
}

/// Replacement of a post's mutable fields
///
/// The store applies it atomically and increments `version`.
#[derive(Debug, Clone, PartialEq)]
pub struct PostPatch {
    pub user_id: Uuid,
    pub operand: f64,
    pub operation: Option<Operation>,
    pub value: f64,
}

/// Unvalidated post fields, as supplied by a client (merged with stored
/// fields on update)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDraft {
    pub operand: Option<f64>,
    pub operation: Option<Operation>,
    pub parent_id: Option<Uuid>,
}

/// Position of a validated post in its chain
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Link {
    /// No parent; an operation may still be recorded but is not applied
    Root { operation: Option<Operation> },

    /// Has a parent and therefore always an operation
    Child { parent_id: Uuid, operation: Operation },
}

/// A post that passed structural validation
///
/// Only obtainable through [`PostDraft::validate`], so a `ValidPost` never
/// carries a missing operand, a child without operation, or a division by
/// zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidPost {
    operand: f64,
    link: Link,
}

impl PostDraft {
    /// Checks the structural invariants, reporting every violation
    ///
    /// # Errors
    ///
    /// Returns the list of violations when:
    /// - `operand` is missing or not finite
    /// - `parentId` is present without an `operation`
    /// - `operation` is `/` and `operand` is zero
    ///
    /// # Example
    ///
    /// ```
    /// use postchain_shared::arithmetic::Operation;
    /// use postchain_shared::models::post::PostDraft;
    ///
    /// let draft = PostDraft {
    ///     operand: Some(0.0),
    ///     operation: Some(Operation::Divide),
    ///     parent_id: None,
    /// };
    ///
    /// let violations = draft.validate().unwrap_err();
    /// assert_eq!(violations[0].message, "Cannot divide by zero!");
    /// ```
    pub fn validate(&self) -> Result<ValidPost, Vec<Violation>> {
        let mut violations = Vec::new();

        match self.operand {
            None => violations.push(Violation::new("operand", "A post must have an operand!")),
            Some(operand) if !operand.is_finite() => {
                violations.push(Violation::new("operand", "Operand must be a finite number!"))
            }
            Some(_) => {}
        }

        if self.parent_id.is_some() && self.operation.is_none() {
            violations.push(Violation::new("operation", "A post must have an operation!"));
        }

        if self.operation == Some(Operation::Divide) && self.operand == Some(0.0) {
            violations.push(Violation::new("operation", "Cannot divide by zero!"));
        }

        let link = match (self.parent_id, self.operation) {
            (Some(parent_id), Some(operation)) => Some(Link::Child {
                parent_id,
                operation,
            }),
            (Some(_), None) => None,
            (None, operation) => Some(Link::Root { operation }),
        };

        match (self.operand, link) {
            (Some(operand), Some(link)) if violations.is_empty() => Ok(ValidPost { operand, link }),
            _ => Err(violations),
        }
    }
}

impl ValidPost {
    /// Operand
    pub fn operand(&self) -> f64 {
        self.operand
    }

    /// Parent to resolve before deriving the value
    pub fn parent_id(&self) -> Option<Uuid> {
        match self.link {
            Link::Root { .. } => None,
            Link::Child { parent_id, .. } => Some(parent_id),
        }
    }

    /// Recorded operation
    pub fn operation(&self) -> Option<Operation> {
        match self.link {
            Link::Root { operation } => operation,
            Link::Child { operation, .. } => Some(operation),
        }
    }

    /// Derives the value from the parent's stored value
    ///
    /// `parent_value` is ignored for roots.
    pub fn derive_value(&self, parent_value: f64) -> f64 {
        match self.link {
            Link::Root { .. } => self.operand,
            Link::Child { operation, .. } => compute(parent_value, operation, self.operand),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(violations: &[Violation]) -> Vec<&str> {
        violations.iter().map(|v| v.message.as_str()).collect()
    }

    #[test]
    fn test_root_value_is_operand() {
        let valid = PostDraft {
            operand: Some(5.0),
            ..Default::default()
        }
        .validate()
        .unwrap();

        assert_eq!(valid.parent_id(), None);
        assert_eq!(valid.derive_value(123.0), 5.0);
    }

    #[test]
    fn test_root_may_record_operation() {
        let valid = PostDraft {
            operand: Some(2.0),
            operation: Some(Operation::Multiply),
            parent_id: None,
        }
        .validate()
        .unwrap();

        assert_eq!(valid.operation(), Some(Operation::Multiply));
        assert_eq!(valid.derive_value(10.0), 2.0);
    }

    #[test]
    fn test_child_value_uses_parent() {
        let parent_id = Uuid::new_v4();
        let valid = PostDraft {
            operand: Some(3.0),
            operation: Some(Operation::Add),
            parent_id: Some(parent_id),
        }
        .validate()
        .unwrap();

        assert_eq!(valid.parent_id(), Some(parent_id));
        assert_eq!(valid.derive_value(5.0), 8.0);
    }

    #[test]
    fn test_missing_operand() {
        let violations = PostDraft::default().validate().unwrap_err();
        assert_eq!(messages(&violations), vec!["A post must have an operand!"]);
        assert_eq!(violations[0].field, "operand");
    }

    #[test]
    fn test_child_without_operation() {
        let violations = PostDraft {
            operand: Some(1.0),
            operation: None,
            parent_id: Some(Uuid::new_v4()),
        }
        .validate()
        .unwrap_err();

        assert_eq!(messages(&violations), vec!["A post must have an operation!"]);
    }

    #[test]
    fn test_divide_by_zero_rejected_for_root_and_child() {
        for parent_id in [None, Some(Uuid::new_v4())] {
            let violations = PostDraft {
                operand: Some(0.0),
                operation: Some(Operation::Divide),
                parent_id,
            }
            .validate()
            .unwrap_err();

            assert_eq!(messages(&violations), vec!["Cannot divide by zero!"]);
        }
    }

    #[test]
    fn test_multiple_violations_reported() {
        let violations = PostDraft {
            operand: None,
            operation: None,
            parent_id: Some(Uuid::new_v4()),
        }
        .validate()
        .unwrap_err();

        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn test_non_finite_operand() {
        let violations = PostDraft {
            operand: Some(f64::INFINITY),
            ..Default::default()
        }
        .validate()
        .unwrap_err();

        assert_eq!(violations[0].field, "operand");
    }

    #[test]
    fn test_row_conversion() {
        let row = PostRow {
            id: Uuid::new_v4(),
            parent_id: None,
            user_id: Uuid::new_v4(),
            operand: 4.0,
            operation: Some("-".to_string()),
            value: 4.0,
            version: 0,
            created_at: Utc::now(),
        };

        let post = Post::try_from(row.clone()).unwrap();
        assert_eq!(post.operation, Some(Operation::Subtract));
        assert!(post.is_root());

        let bad = PostRow {
            operation: Some("%".to_string()),
            ..row
        };
        assert!(Post::try_from(bad).is_err());
    }

    #[test]
    fn test_serializes_camel_case_without_absent_fields() {
        let post = Post {
            id: Uuid::new_v4(),
            parent_id: None,
            user_id: Uuid::new_v4(),
            operand: 5.0,
            operation: None,
            value: 5.0,
            version: 0,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&post).unwrap();
        assert!(json.get("userId").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("parentId").is_none());
        assert!(json.get("operation").is_none());
    }
}
