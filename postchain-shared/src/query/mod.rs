/// Query feature translator
///
/// Turns the untrusted key/value pairs of a URL query string into a
/// store-agnostic [`QuerySpec`]: filter predicates, sort keys, a projection
/// and pagination. Storage backends consume the spec through their own
/// adapter:
///
/// - [`postgres`]: builds a parameterized `SELECT` with sqlx's `QueryBuilder`
/// - [`memory`]: evaluates the spec over serialized documents
///
/// The translator has no knowledge of entities. Field names are only checked
/// against a collection's [`Schema`](schema::Schema) when an adapter runs the
/// spec, via [`QuerySpec::validate`].
///
/// # Example
///
/// ```
/// use postchain_shared::query::{Comparison, QuerySpec, SortDirection};
///
/// let spec = QuerySpec::from_pairs(vec![
///     ("price[gte]".to_string(), "100".to_string()),
///     ("sort".to_string(), "-createdAt,price".to_string()),
///     ("page".to_string(), "2".to_string()),
///     ("limit".to_string(), "10".to_string()),
/// ])
/// .unwrap();
///
/// assert_eq!(spec.filter[0].comparison, Comparison::Gte);
/// assert_eq!(spec.sort[0].direction, SortDirection::Desc);
/// assert_eq!(spec.pagination.skip(), 10);
/// ```

pub mod memory;
pub mod postgres;
pub mod schema;

use crate::error::{DomainError, DomainResult};
use schema::Schema;

/// Keys that configure the query rather than filter it
pub const RESERVED_KEYS: [&str; 4] = ["page", "sort", "limit", "fields"];

/// Page used when `page` is absent or invalid
pub const DEFAULT_PAGE: u64 = 1;

/// Page size used when `limit` is absent or invalid
pub const DEFAULT_LIMIT: u64 = 100;

/// Field used for the default sort
pub const DEFAULT_SORT_FIELD: &str = "createdAt";

/// Comparison operator of a filter predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `field=value`
    Eq,
    /// `field[gt]=value`
    Gt,
    /// `field[gte]=value`
    Gte,
    /// `field[lt]=value`
    Lt,
    /// `field[lte]=value`
    Lte,
}

impl Comparison {
    /// Parses a bracketed range token (`gte`, `gt`, `lte`, `lt`)
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "gt" => Some(Comparison::Gt),
            "gte" => Some(Comparison::Gte),
            "lt" => Some(Comparison::Lt),
            "lte" => Some(Comparison::Lte),
            _ => None,
        }
    }

    /// Checks whether an ordering between a stored value and the predicate
    /// value satisfies this comparison
    pub fn matches(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;

        match self {
            Comparison::Eq => ordering == Equal,
            Comparison::Gt => ordering == Greater,
            Comparison::Gte => ordering != Less,
            Comparison::Lt => ordering == Less,
            Comparison::Lte => ordering != Greater,
        }
    }
}

/// A single filter predicate, value still untyped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    /// Wire field name
    pub field: String,

    /// Comparison operator
    pub comparison: Comparison,

    /// Raw value from the query string
    pub value: String,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One sort key; keys apply in listed order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Wire field name
    pub field: String,

    /// Direction
    pub direction: SortDirection,
}

impl SortKey {
    /// Parses `field` (ascending) or `-field` (descending)
    fn parse(token: &str) -> Self {
        match token.strip_prefix('-') {
            Some(field) => SortKey {
                field: field.to_string(),
                direction: SortDirection::Desc,
            },
            None => SortKey {
                field: token.to_string(),
                direction: SortDirection::Asc,
            },
        }
    }
}

/// Which fields of each document to return
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Projection {
    /// All fields except internal ones
    #[default]
    Default,

    /// Exactly these fields (plus `id`)
    Include(Vec<String>),

    /// All fields except these (and internal ones)
    Exclude(Vec<String>),
}

impl Projection {
    /// Parses the `fields` parameter
    fn parse(raw: &str) -> DomainResult<Self> {
        let tokens: Vec<&str> = split_list(raw).collect();
        if tokens.is_empty() {
            return Ok(Projection::Default);
        }

        let excluded = tokens.iter().filter(|t| t.starts_with('-')).count();
        if excluded == 0 {
            Ok(Projection::Include(
                tokens.into_iter().map(str::to_string).collect(),
            ))
        } else if excluded == tokens.len() {
            Ok(Projection::Exclude(
                tokens
                    .into_iter()
                    .map(|t| t.trim_start_matches('-').to_string())
                    .collect(),
            ))
        } else {
            Err(DomainError::InvalidQuery(
                "Cannot mix included and excluded fields".to_string(),
            ))
        }
    }

    /// Whether `field` survives this projection
    pub fn keeps(&self, field: &str, schema: &Schema) -> bool {
        if field == "id" {
            return true;
        }

        match self {
            Projection::Default => !schema.is_internal(field),
            Projection::Include(fields) => fields.iter().any(|f| f == field),
            Projection::Exclude(fields) => {
                !schema.is_internal(field) && !fields.iter().any(|f| f == field)
            }
        }
    }

    /// Removes the fields this projection drops from a rendered document
    pub fn apply(
        &self,
        document: &mut serde_json::Map<String, serde_json::Value>,
        schema: &Schema,
    ) {
        document.retain(|key, _| self.keeps(key, schema));
    }

    fn named_fields(&self) -> &[String] {
        match self {
            Projection::Default => &[],
            Projection::Include(fields) | Projection::Exclude(fields) => fields,
        }
    }
}

/// Page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based page number
    pub page: u64,

    /// Page size
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    /// Number of documents to skip
    pub fn skip(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

/// Store-agnostic query directives
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuerySpec {
    /// Conjunction of predicates
    pub filter: Vec<Predicate>,

    /// Sort keys in priority order (never empty once parsed)
    pub sort: Vec<SortKey>,

    /// Field selection
    pub projection: Projection,

    /// Page window
    pub pagination: Pagination,
}

impl QuerySpec {
    /// Translates query-string pairs into a spec
    ///
    /// When a key repeats, the last value wins.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidQuery` for malformed filter keys
    /// (unknown bracket operators, empty field names) or a `fields` list that
    /// mixes inclusion and exclusion.
    pub fn from_pairs<I>(pairs: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let pairs = last_value_wins(pairs);
        let lookup = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        let filter = pairs
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| parse_predicate(key, value))
            .collect::<DomainResult<Vec<_>>>()?;

        let mut sort: Vec<SortKey> = lookup("sort")
            .map(|raw| split_list(raw).map(SortKey::parse).collect())
            .unwrap_or_default();
        if sort.is_empty() {
            sort.push(SortKey {
                field: DEFAULT_SORT_FIELD.to_string(),
                direction: SortDirection::Desc,
            });
        }

        let projection = match lookup("fields") {
            Some(raw) => Projection::parse(raw)?,
            None => Projection::Default,
        };

        let pagination = Pagination {
            page: parse_positive(lookup("page"), DEFAULT_PAGE),
            limit: parse_positive(lookup("limit"), DEFAULT_LIMIT),
        };

        Ok(Self {
            filter,
            sort,
            projection,
            pagination,
        })
    }

    /// Checks every field the spec names against a collection schema
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidQuery` naming the first unknown field.
    pub fn validate(&self, schema: &Schema) -> DomainResult<()> {
        let named = self
            .filter
            .iter()
            .map(|p| p.field.as_str())
            .chain(self.sort.iter().map(|s| s.field.as_str()))
            .chain(self.projection.named_fields().iter().map(String::as_str));

        for field in named {
            schema.field(field)?;
        }

        Ok(())
    }
}

/// Splits a comma-separated list, dropping blanks
fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn last_value_wins<I>(pairs: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut deduped: Vec<(String, String)> = Vec::new();
    for (key, value) in pairs {
        match deduped.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => deduped.push((key, value)),
        }
    }
    deduped
}

fn parse_predicate(key: &str, value: &str) -> DomainResult<Predicate> {
    let (field, comparison) = match key.split_once('[') {
        None => (key, Comparison::Eq),
        Some((field, rest)) => {
            let token = rest.strip_suffix(']').ok_or_else(|| {
                DomainError::InvalidQuery(format!("Malformed filter key '{}'", key))
            })?;
            let comparison = Comparison::from_token(token).ok_or_else(|| {
                DomainError::InvalidQuery(format!(
                    "Unsupported filter operator '{}' on '{}'",
                    token, field
                ))
            })?;
            (field, comparison)
        }
    };

    if field.is_empty() {
        return Err(DomainError::InvalidQuery(format!(
            "Malformed filter key '{}'",
            key
        )));
    }

    Ok(Predicate {
        field: field.to_string(),
        comparison,
        value: value.to_string(),
    })
}

fn parse_positive(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}
