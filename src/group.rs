//! Route groups.
//!
//! A group is a path prefix plus the middlewares that run for every request
//! under it. Groups live inside the [`Engine`]; a [`RouterGroup`] is a
//! short-lived handle used to configure one of them:
//!
//! ```rust
//! use cob::{Context, Engine};
//!
//! fn auth(c: &mut Context) { c.next() }
//! fn list(c: &mut Context) { c.string(200, "[]") }
//!
//! let mut engine = Engine::new();
//! let mut v1 = engine.group("/v1");
//! v1.use_(auth).get("/items", list);
//! ```
//!
//! # Middleware ownership
//!
//! A child group starts with an empty middleware list; nothing is copied
//! from its parent. Parent middlewares still run for the child's routes,
//! because the parent's prefix is a prefix of the child's and the engine
//! applies every matching group. [`use_`](RouterGroup::use_) on either
//! group only ever changes that group's own list.

use crate::engine::Engine;
use crate::handler::{Handler, HandlerFunc};
use crate::method::Method;

/// The data behind a group, owned by the engine.
pub(crate) struct GroupData {
    pub(crate) prefix: String,
    pub(crate) middlewares: Vec<HandlerFunc>,
}

impl GroupData {
    pub(crate) fn new(prefix: String) -> Self {
        Self { prefix, middlewares: Vec::new() }
    }
}

/// A handle to one group of an [`Engine`].
pub struct RouterGroup<'e> {
    engine: &'e mut Engine,
    index: usize,
}

impl<'e> RouterGroup<'e> {
    pub(crate) fn new(engine: &'e mut Engine, index: usize) -> Self {
        Self { engine, index }
    }

    fn data(&self) -> &GroupData {
        &self.engine.groups[self.index]
    }

    pub fn prefix(&self) -> &str {
        &self.data().prefix
    }

    /// Creates a group under this one; its prefix is this group's prefix
    /// followed by `prefix`.
    pub fn group(&mut self, prefix: &str) -> RouterGroup<'_> {
        let prefix = format!("{}{prefix}", self.prefix());
        let index = self.engine.push_group(prefix);
        RouterGroup::new(self.engine, index)
    }

    /// Appends a middleware to this group.
    pub fn use_(&mut self, middleware: impl Handler) -> &mut Self {
        self.engine.groups[self.index]
            .middlewares
            .push(middleware.into_handler_func());
        self
    }

    /// Registers `handler` for `method` at this group's prefix + `pattern`.
    ///
    /// # Panics
    ///
    /// Panics if the full pattern does not begin with `/` or duplicates a
    /// registered route.
    pub fn add_route(&mut self, method: Method, pattern: &str, handler: impl Handler) -> &mut Self {
        let pattern = format!("{}{pattern}", self.prefix());
        self.engine
            .router
            .add_route(method, &pattern, handler.into_handler_func());
        self
    }
}

/// Generates the per-method shorthands on top of `add_route`.
macro_rules! method_routes {
    ($($name:ident => $method:ident),* $(,)?) => {
        $(
            #[doc = concat!("Registers a `", stringify!($method), "` route. See `add_route`.")]
            pub fn $name(&mut self, pattern: &str, handler: impl $crate::handler::Handler) -> &mut Self {
                self.add_route($crate::method::Method::$method, pattern, handler)
            }
        )*
    };
}

pub(crate) use method_routes;

impl RouterGroup<'_> {
    method_routes! {
        get     => Get,
        post    => Post,
        put     => Put,
        delete  => Delete,
        patch   => Patch,
        head    => Head,
        options => Options,
    }
}
