//! Dispatch engine: owns the router and the group table, resolves requests

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Request, Response};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::error::Result;
use crate::handler::{GroupNode, HandlerFunc, RouterGroup};
use crate::http;
use crate::routing::{Lookup, Params, Router};
use crate::server;

/// Registered route bound to its compiled handler chain
pub(crate) type RouteThunk =
    Box<dyn Fn(Request<Bytes>, Params) -> Response<Full<Bytes>> + Send + Sync>;

const ROOT_GROUP: usize = 0;

/// A (method, pattern) registration, as listed by [`Engine::routes`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub method: String,
    pub path: String,
    /// Length of the effective handler chain
    pub handlers: usize,
}

/// Composition root of an application.
///
/// Routes are added through the root group (methods on `Engine` delegate to
/// it) or through nested groups from [`Engine::group`]. Once registration is
/// done the engine is only read, so it can be shared across request tasks.
pub struct Engine {
    pub(crate) router: Router<RouteThunk>,
    pub(crate) groups: Vec<GroupNode>,
    pub(crate) routes: Vec<RouteInfo>,
    config: Config,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            router: Router::new(),
            groups: vec![GroupNode::root()],
            routes: Vec::new(),
            config,
        }
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Every registration so far, in registration order
    pub fn routes(&self) -> &[RouteInfo] {
        &self.routes
    }

    /// Handle on the root group (prefix `/`)
    pub fn root(&mut self) -> RouterGroup<'_> {
        RouterGroup::new(self, ROOT_GROUP)
    }

    pub fn group(&mut self, prefix: &str) -> RouterGroup<'_> {
        self.groups.push(GroupNode {
            prefix: prefix.to_string(),
            parent: Some(ROOT_GROUP),
            handlers: Vec::new(),
        });
        let id = self.groups.len() - 1;
        RouterGroup::new(self, id)
    }

    pub fn use_handlers<I>(&mut self, handlers: I) -> &mut Self
    where
        I: IntoIterator<Item = HandlerFunc>,
    {
        self.root().use_handlers(handlers);
        self
    }

    pub fn register<I>(&mut self, method: &str, path: &str, handlers: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = HandlerFunc>,
    {
        self.root().register(method, path, handlers)?;
        Ok(self)
    }

    pub fn get<I>(&mut self, path: &str, handlers: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = HandlerFunc>,
    {
        self.register("GET", path, handlers)
    }

    pub fn post<I>(&mut self, path: &str, handlers: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = HandlerFunc>,
    {
        self.register("POST", path, handlers)
    }

    pub fn put<I>(&mut self, path: &str, handlers: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = HandlerFunc>,
    {
        self.register("PUT", path, handlers)
    }

    pub fn delete<I>(&mut self, path: &str, handlers: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = HandlerFunc>,
    {
        self.register("DELETE", path, handlers)
    }

    /// Resolve the request through the router and run the matched chain.
    ///
    /// Unmatched paths get 404; paths registered only under other methods
    /// get 405 with an `Allow` header.
    pub fn serve(&self, request: Request<Bytes>) -> Response<Full<Bytes>> {
        let method = request.method().as_str().to_owned();
        let path = request.uri().path().to_owned();

        match self.router.lookup(&method, &path) {
            Lookup::Found { value, params } => value(request, params),
            Lookup::MethodNotAllowed(allowed) => http::build_405_response(&allowed),
            Lookup::NotFound => http::build_404_response(),
        }
    }

    /// Bind `addr` and serve forever. Returns only on a fatal listener error.
    ///
    /// `addr` is `host:port` or `:port` for all interfaces.
    pub async fn run(self, addr: &str) -> Result<()> {
        let listener = server::bind(addr).await?;
        self.run_until(listener, std::future::pending()).await
    }

    /// Serve an already-bound listener until `shutdown` resolves.
    pub async fn run_until<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        server::serve(Arc::new(self), listener, shutdown).await
    }
}
