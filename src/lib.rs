//! # tinygin
//!
//! A small HTTP request-dispatch framework on tokio and hyper.
//!
//! Routes are registered on handler groups that nest under path prefixes.
//! Each route is compiled at registration time into a fixed chain: every
//! ancestor group's handlers (outermost first), then the group's own, then
//! the route's. A request runs that chain on a fresh [`Context`].
//!
//! ```rust,no_run
//! use tinygin::{handler, Engine};
//!
//! # async fn app() -> tinygin::Result<()> {
//! let mut engine = Engine::new();
//! engine.get("/ping", [handler(|c| c.string(200, "pong"))])?;
//!
//! let mut api = engine.group("/api");
//! api.use_handlers([handler(|c| {
//!     if c.request.headers().get("authorization").is_none() {
//!         c.abort_with_status(401);
//!     }
//! })]);
//! api.get("/users/{id}", [handler(|c| {
//!     let id = c.param("id").unwrap_or_default().to_string();
//!     c.json(200, &serde_json::json!({ "id": id }));
//! })])?;
//!
//! engine.run(":8082").await
//! # }
//! ```

pub mod config;
mod engine;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod routing;
pub mod server;

pub use config::Config;
pub use engine::{Engine, RouteInfo};
pub use error::{Error, Result};
pub use handler::{handler, Context, ErrorRecord, HandlerFunc, RouterGroup};
pub use routing::Params;
