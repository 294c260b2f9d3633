//! Routing module
//!
//! Adapts the `matchit` radix tree into a per-method router and provides the
//! path joining used when groups nest.

mod path;
mod router;

pub use path::{clean_path, join_paths};
pub use router::{Lookup, Params, Router};
