/// PostgreSQL adapter for [`QuerySpec`]
///
/// Builds `SELECT <columns> FROM <table> WHERE ... ORDER BY ... LIMIT ... OFFSET ...`
/// with sqlx's `QueryBuilder`. Column names come only from the collection
/// schema and every predicate value is a bound parameter, so nothing from the
/// query string is spliced into SQL text.
///
/// Projection is not pushed down: the full row is needed to build the entity
/// and expand its relations, and the projection is applied when rendering.

use super::schema::{Scalar, Schema};
use super::{Comparison, QuerySpec, SortDirection};
use crate::error::DomainResult;
use sqlx::{Postgres, QueryBuilder};

/// Builds the full select statement for `spec` against `schema`
///
/// # Errors
///
/// Returns `DomainError::InvalidQuery` for unknown fields or values that do
/// not parse as their field's kind.
///
/// # Example
///
/// ```
/// use postchain_shared::models::post::POST_SCHEMA;
/// use postchain_shared::query::{postgres::build_select, QuerySpec};
///
/// let spec = QuerySpec::from_pairs(vec![("value[gt]".to_string(), "3".to_string())]).unwrap();
/// let builder = build_select(&spec, &POST_SCHEMA).unwrap();
/// assert!(builder.sql().contains("WHERE value > $1"));
/// ```
pub fn build_select<'args>(
    spec: &QuerySpec,
    schema: &Schema,
) -> DomainResult<QueryBuilder<'args, Postgres>> {
    spec.validate(schema)?;

    let mut builder = QueryBuilder::new(format!(
        "SELECT {} FROM {}",
        schema.select_list(),
        schema.collection
    ));

    push_filter(&mut builder, spec, schema)?;
    push_order(&mut builder, spec, schema)?;

    let skip = i64::try_from(spec.pagination.skip()).unwrap_or(i64::MAX);
    let limit = i64::try_from(spec.pagination.limit).unwrap_or(i64::MAX);
    builder.push(" LIMIT ");
    builder.push_bind(limit);
    builder.push(" OFFSET ");
    builder.push_bind(skip);

    Ok(builder)
}

fn push_filter(
    builder: &mut QueryBuilder<'_, Postgres>,
    spec: &QuerySpec,
    schema: &Schema,
) -> DomainResult<()> {
    for (index, predicate) in spec.filter.iter().enumerate() {
        let field = schema.field(&predicate.field)?;
        let value = field.parse_value(&predicate.value)?;

        builder.push(if index == 0 { " WHERE " } else { " AND " });
        builder.push(field.column);
        builder.push(comparison_sql(predicate.comparison));

        match value {
            Scalar::Uuid(v) => builder.push_bind(v),
            Scalar::Number(v) => builder.push_bind(v),
            Scalar::Integer(v) => builder.push_bind(v),
            Scalar::Text(v) => builder.push_bind(v),
            Scalar::Timestamp(v) => builder.push_bind(v),
        };
    }

    Ok(())
}

fn push_order(
    builder: &mut QueryBuilder<'_, Postgres>,
    spec: &QuerySpec,
    schema: &Schema,
) -> DomainResult<()> {
    builder.push(" ORDER BY ");
    for key in &spec.sort {
        let field = schema.field(&key.field)?;
        builder.push(field.column);
        builder.push(match key.direction {
            SortDirection::Asc => " ASC, ",
            SortDirection::Desc => " DESC, ",
        });
    }
    // Stable order across pages
    builder.push("id ASC");

    Ok(())
}

fn comparison_sql(comparison: Comparison) -> &'static str {
    match comparison {
        Comparison::Eq => " = ",
        Comparison::Gt => " > ",
        Comparison::Gte => " >= ",
        Comparison::Lt => " < ",
        Comparison::Lte => " <= ",
    }
}
