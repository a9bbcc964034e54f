/// Entity models
///
/// # Models
///
/// - `user`: User accounts
/// - `post`: Posts forming computation chains, and their validation
///
/// Each model exposes a query [`Schema`](crate::query::schema::Schema)
/// describing its queryable fields.

pub mod post;
pub mod user;
