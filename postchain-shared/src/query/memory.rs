/// In-memory adapter for [`QuerySpec`]
///
/// Evaluates a spec over entities by serializing each one to its wire
/// document and comparing typed field values. Ordering mirrors the
/// PostgreSQL adapter: missing values sort after present ones in ascending
/// order, and `id` breaks ties.

use super::schema::{FieldDef, Scalar, Schema};
use super::{QuerySpec, SortDirection};
use crate::error::{DomainError, DomainResult};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::cmp::Ordering;

/// Filters, sorts and paginates `items` according to `spec`
///
/// # Errors
///
/// Returns `DomainError::InvalidQuery` for unknown fields or untyped values,
/// and `DomainError::CorruptRecord` if an entity fails to serialize.
pub fn run<T>(items: &[T], spec: &QuerySpec, schema: &Schema) -> DomainResult<Vec<T>>
where
    T: Serialize + Clone,
{
    spec.validate(schema)?;

    let predicates = spec
        .filter
        .iter()
        .map(|p| {
            let field = schema.field(&p.field)?;
            Ok((field, p.comparison, field.parse_value(&p.value)?))
        })
        .collect::<DomainResult<Vec<_>>>()?;

    let sort_fields = spec
        .sort
        .iter()
        .map(|key| Ok((schema.field(&key.field)?, key.direction)))
        .collect::<DomainResult<Vec<_>>>()?;
    let id_field = schema.field("id")?;

    let mut matched = Vec::new();
    for item in items {
        let document = serde_json::to_value(item)
            .map_err(|e| DomainError::CorruptRecord(e.to_string()))?;

        let keep = predicates.iter().all(|(field, comparison, expected)| {
            read(&document, field)
                .and_then(|actual| actual.compare(expected))
                .map(|ordering| comparison.matches(ordering))
                .unwrap_or(false)
        });

        if keep {
            matched.push((document, item));
        }
    }

    matched.sort_by(|(a, _), (b, _)| {
        sort_fields
            .iter()
            .map(|(field, direction)| {
                let ordering = compare_missing_last(read(a, field), read(b, field));
                match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            })
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| compare_missing_last(read(a, id_field), read(b, id_field)))
    });

    let skip = usize::try_from(spec.pagination.skip()).unwrap_or(usize::MAX);
    let limit = usize::try_from(spec.pagination.limit).unwrap_or(usize::MAX);

    Ok(matched
        .into_iter()
        .skip(skip)
        .take(limit)
        .map(|(_, item)| item.clone())
        .collect())
}

fn read(document: &JsonValue, field: &FieldDef) -> Option<Scalar> {
    document
        .get(field.name)
        .and_then(|value| field.kind.from_json(value))
}

fn compare_missing_last(a: Option<Scalar>, b: Option<Scalar>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.compare(&b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
