//! HTTP protocol layer module
//!
//! The response writer handed to handlers, the buffering sink behind it, and
//! the fixed responses the dispatcher produces on its own.

pub mod response;
pub mod writer;

pub use response::{
    build_404_response, build_405_response, build_413_response, build_500_response,
};
pub use writer::{ResponseBuffer, ResponseSink, ResponseWriter};
