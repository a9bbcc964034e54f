/// Domain services
///
/// Services orchestrate validation, store calls and rendering for one entity.
/// They return domain types or rendered JSON documents and never know about
/// HTTP.

pub mod posts;

pub use posts::{Expand, PostService};
