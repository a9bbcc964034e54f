/// Collection schemas for query adapters
///
/// A schema maps wire field names to storage columns and value kinds so that
/// adapters can reject unknown fields and type predicate values before they
/// reach a store.

use crate::error::{DomainError, DomainResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use uuid::Uuid;

/// Value kind of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Uuid,
    Number,
    Integer,
    Text,
    Timestamp,
}

/// A typed value, parsed from a query string or read from a document
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Uuid(Uuid),
    Number(f64),
    Integer(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl Scalar {
    /// Orders two scalars of the same kind; `None` for mismatched kinds or NaN
    pub fn compare(&self, other: &Scalar) -> Option<Ordering> {
        match (self, other) {
            (Scalar::Uuid(a), Scalar::Uuid(b)) => Some(a.cmp(b)),
            (Scalar::Number(a), Scalar::Number(b)) => a.partial_cmp(b),
            (Scalar::Integer(a), Scalar::Integer(b)) => Some(a.cmp(b)),
            (Scalar::Text(a), Scalar::Text(b)) => Some(a.cmp(b)),
            (Scalar::Timestamp(a), Scalar::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl FieldKind {
    /// Parses a raw query-string value as this kind
    ///
    /// Timestamps accept RFC 3339 or a bare `YYYY-MM-DD` date (midnight UTC).
    pub fn parse(&self, raw: &str) -> Option<Scalar> {
        let raw = raw.trim();
        match self {
            FieldKind::Uuid => Uuid::parse_str(raw).ok().map(Scalar::Uuid),
            FieldKind::Number => raw
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Scalar::Number),
            FieldKind::Integer => raw.parse::<i64>().ok().map(Scalar::Integer),
            FieldKind::Text => Some(Scalar::Text(raw.to_string())),
            FieldKind::Timestamp => DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                        .ok()
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                        .map(|dt| dt.and_utc())
                })
                .map(Scalar::Timestamp),
        }
    }

    /// Reads a serialized document value as this kind
    pub fn from_json(&self, value: &JsonValue) -> Option<Scalar> {
        match (self, value) {
            (FieldKind::Number, JsonValue::Number(n)) => n.as_f64().map(Scalar::Number),
            (FieldKind::Integer, JsonValue::Number(n)) => n.as_i64().map(Scalar::Integer),
            (_, JsonValue::String(s)) => self.parse(s),
            _ => None,
        }
    }
}

/// A field of a collection
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    /// Wire name (camelCase)
    pub name: &'static str,

    /// Storage column
    pub column: &'static str,

    /// Value kind
    pub kind: FieldKind,

    /// Internal version metadata, hidden unless explicitly selected
    pub internal: bool,
}

impl FieldDef {
    /// A regular field
    pub const fn new(name: &'static str, column: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            column,
            kind,
            internal: false,
        }
    }

    /// An internal metadata field
    pub const fn internal(name: &'static str, column: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            column,
            kind,
            internal: true,
        }
    }

    /// Parses a predicate value for this field
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidQuery` when the value does not fit the kind.
    pub fn parse_value(&self, raw: &str) -> DomainResult<Scalar> {
        self.kind.parse(raw).ok_or_else(|| {
            DomainError::InvalidQuery(format!(
                "Invalid value '{}' for field '{}'",
                raw, self.name
            ))
        })
    }
}

/// A queryable collection
#[derive(Debug)]
pub struct Schema {
    /// Table / collection name
    pub collection: &'static str,

    /// Queryable fields
    pub fields: &'static [FieldDef],

    /// Columns loaded with every row but never filterable, sortable or
    /// selectable from a query string
    pub hidden_columns: &'static [&'static str],
}

impl Schema {
    /// Looks up a field by wire name
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidQuery` for unknown fields.
    pub fn field(&self, name: &str) -> DomainResult<&FieldDef> {
        self.fields.iter().find(|f| f.name == name).ok_or_else(|| {
            DomainError::InvalidQuery(format!(
                "Unknown field '{}' for {}",
                name, self.collection
            ))
        })
    }

    /// Whether `name` is internal metadata
    pub fn is_internal(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name && f.internal)
    }

    /// Comma-separated column list for `SELECT`
    pub fn select_list(&self) -> String {
        self.fields
            .iter()
            .map(|f| f.column)
            .chain(self.hidden_columns.iter().copied())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
