//! Handler groups: handler chains composed under nested path prefixes

use std::sync::Arc;

use super::context::{Context, HandlerFunc};
use crate::engine::{Engine, RouteInfo, RouteThunk};
use crate::error::{Error, Result};
use crate::logger;
use crate::routing::join_paths;

/// Index of a group in the engine's group table
pub(crate) type GroupId = usize;

/// Stored state of one group. The root group has index 0, no parent and
/// prefix `/`.
pub(crate) struct GroupNode {
    pub(crate) prefix: String,
    pub(crate) parent: Option<GroupId>,
    pub(crate) handlers: Vec<HandlerFunc>,
}

impl GroupNode {
    pub(crate) fn root() -> Self {
        Self {
            prefix: "/".to_string(),
            parent: None,
            handlers: Vec::new(),
        }
    }
}

/// Builder handle for one handler group.
///
/// Borrows the engine for as long as routes are being added to the group.
/// Chains are snapshotted at registration: handlers added with
/// [`use_handlers`](Self::use_handlers) afterwards do not reach routes that
/// are already registered.
pub struct RouterGroup<'e> {
    engine: &'e mut Engine,
    id: GroupId,
}

impl<'e> RouterGroup<'e> {
    pub(crate) fn new(engine: &'e mut Engine, id: GroupId) -> Self {
        Self { engine, id }
    }

    /// Append handlers to this group's own list
    pub fn use_handlers<I>(&mut self, handlers: I) -> &mut Self
    where
        I: IntoIterator<Item = HandlerFunc>,
    {
        self.engine.groups[self.id].handlers.extend(handlers);
        self
    }

    /// Create a child group under `prefix`
    pub fn group(&mut self, prefix: &str) -> RouterGroup<'_> {
        let id = self.engine.groups.len();
        self.engine.groups.push(GroupNode {
            prefix: prefix.to_string(),
            parent: Some(self.id),
            handlers: Vec::new(),
        });
        RouterGroup::new(self.engine, id)
    }

    /// Ancestors from the root down to this group
    fn lineage(&self) -> Vec<GroupId> {
        let mut ids = vec![self.id];
        let mut current = self.engine.groups[self.id].parent;
        while let Some(parent) = current {
            ids.push(parent);
            current = self.engine.groups[parent].parent;
        }
        ids.reverse();
        ids
    }

    /// Prefix of this group joined with every ancestor's prefix
    pub fn base_path(&self) -> String {
        self.lineage()
            .into_iter()
            .fold(String::new(), |acc, id| {
                join_paths(&acc, &self.engine.groups[id].prefix)
            })
    }

    /// Ancestor handlers (outermost first), then this group's, then `route`
    fn combine_handlers(&self, route: Vec<HandlerFunc>) -> Vec<HandlerFunc> {
        let mut chain: Vec<HandlerFunc> = self
            .lineage()
            .into_iter()
            .flat_map(|id| self.engine.groups[id].handlers.iter().cloned())
            .collect();
        chain.extend(route);
        chain
    }

    /// Bind `handlers` to `method` and `path` below this group's prefix.
    pub fn register<I>(&mut self, method: &str, path: &str, handlers: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = HandlerFunc>,
    {
        let method = method.to_ascii_uppercase();
        let full_path = join_paths(&self.base_path(), path);
        let chain: Arc<[HandlerFunc]> = self.combine_handlers(handlers.into_iter().collect()).into();
        let handler_count = chain.len();

        let pattern = full_path.clone();
        let thunk: RouteThunk = Box::new(move |request, params| {
            let mut ctx = Context::new(request, params, Arc::clone(&chain))
                .with_full_path(pattern.as_str());
            ctx.next();
            if !ctx.errors().is_empty() {
                logger::log_handler_errors(ctx.request.method().as_str(), &pattern, ctx.errors());
            }
            ctx.into_response()
        });

        self.engine
            .router
            .insert(&method, &full_path, thunk)
            .map_err(|source| Error::Route {
                method: method.clone(),
                path: full_path.clone(),
                source,
            })?;

        if self.engine.config().is_debug() {
            logger::log_route(&method, &full_path, handler_count);
        }
        self.engine.routes.push(RouteInfo {
            method,
            path: full_path,
            handlers: handler_count,
        });
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

    pub fn patch<I>(&mut self, path: &str, handlers: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = HandlerFunc>,
    {
        self.register("PATCH", path, handlers)
    }

    pub fn delete<I>(&mut self, path: &str, handlers: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = HandlerFunc>,
    {
        self.register("DELETE", path, handlers)
    }

    pub fn head<I>(&mut self, path: &str, handlers: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = HandlerFunc>,
    {
        self.register("HEAD", path, handlers)
    }

    pub fn options<I>(&mut self, path: &str, handlers: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = HandlerFunc>,
    {
        self.register("OPTIONS", path, handlers)
    }

    /// Register the same chain for every method shorthand above.
    ///
    /// All-or-nothing: if the path conflicts under any method, nothing is
    /// registered.
    pub fn any<I>(&mut self, path: &str, handlers: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = HandlerFunc>,
    {
        const METHODS: [&str; 7] = ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

        let full_path = join_paths(&self.base_path(), path);
        for method in METHODS {
            self.engine
                .router
                .check(method, &full_path)
                .map_err(|source| Error::Route {
                    method: method.to_string(),
                    path: full_path.clone(),
                    source,
                })?;
        }

        let handlers: Vec<HandlerFunc> = handlers.into_iter().collect();
        for method in METHODS {
            self.register(method, path, handlers.iter().cloned())?;
        }
        Ok(self)
    }
}
