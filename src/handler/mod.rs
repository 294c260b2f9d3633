//! Request handler module
//!
//! Handler functions, the per-request [`Context`] that drives a handler
//! chain, and [`RouterGroup`] for composing chains under path prefixes.

mod context;
mod group;

pub use context::{handler, Context, ErrorRecord, HandlerFunc};
pub use group::RouterGroup;
pub(crate) use group::GroupNode;
