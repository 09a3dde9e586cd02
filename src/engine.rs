//! The top-level dispatcher.

use bytes::Bytes;

use crate::context::Context;
use crate::error::Error;
use crate::group::{GroupData, RouterGroup, method_routes};
use crate::handler::Handler;
use crate::method::Method;
use crate::middleware;
use crate::request::Request;
use crate::router::Router;
use crate::server::Server;

/// Default cap on a request body, 32 MiB.
pub const DEFAULT_MAX_BODY_SIZE: usize = 32 << 20;

/// The application: a router plus every route group.
///
/// The engine itself acts as the root group (prefix `""`), so routes and
/// middlewares can be registered on it directly. Build it once at startup;
/// [`run`](Engine::run) consumes it, after which routes are read-only.
///
/// ```rust,no_run
/// use cob::{Context, Engine};
///
/// fn hello(c: &mut Context) {
///     let name = c.param("name").unwrap_or("stranger").to_owned();
///     c.string(200, format_args!("hello {name}\n"));
/// }
///
/// #[tokio::main]
/// async fn main() -> Result<(), cob::Error> {
///     let mut engine = Engine::default();
///     engine.get("/hello/:name", hello);
///     engine.run("0.0.0.0:9999").await
/// }
/// ```
pub struct Engine {
    pub(crate) router: Router,
    pub(crate) body_limit: usize,
    /// The root group is always first.
    pub(crate) groups: Vec<GroupData>,
}

impl Engine {
    /// An engine with no middleware.
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            body_limit: DEFAULT_MAX_BODY_SIZE,
            groups: vec![GroupData::new(String::new())],
        }
    }

    /// Caps the bytes the server reads from a request body. Larger bodies
    /// are refused with 413 before any handler runs.
    pub fn max_body_size(&mut self, bytes: usize) -> &mut Self {
        self.body_limit = bytes;
        self
    }

    pub(crate) fn push_group(&mut self, prefix: String) -> usize {
        self.groups.push(GroupData::new(prefix));
        self.groups.len() - 1
    }

    /// The root group.
    pub fn root(&mut self) -> RouterGroup<'_> {
        RouterGroup::new(self, 0)
    }

    /// Creates a top-level group with the given prefix.
    pub fn group(&mut self, prefix: &str) -> RouterGroup<'_> {
        let index = self.push_group(prefix.to_owned());
        RouterGroup::new(self, index)
    }

    /// Appends a middleware to the root group: it runs for every request.
    pub fn use_(&mut self, middleware: impl Handler) -> &mut Self {
        self.root().use_(middleware);
        self
    }

    /// Registers a route on the root group.
    pub fn add_route(&mut self, method: Method, pattern: &str, handler: impl Handler) -> &mut Self {
        self.root().add_route(method, pattern, handler);
        self
    }

    method_routes! {
        get     => Get,
        post    => Post,
        put     => Put,
        delete  => Delete,
        patch   => Patch,
        head    => Head,
        options => Options,
    }

    /// Serves one request: assembles the chain from every group whose prefix
    /// starts the request path, lets the router append the route handler,
    /// and runs it.
    ///
    /// Middlewares run in group registration order, and within a group in
    /// the order they were added.
    pub fn handle(&self, req: Request) -> http::Response<Bytes> {
        let middlewares = self
            .groups
            .iter()
            .filter(|group| req.path().starts_with(&group.prefix))
            .flat_map(|group| group.middlewares.iter().cloned())
            .collect();

        let mut c = Context::new(req);
        c.handlers = middlewares;
        self.router.handle(&mut c);
        c.finish()
    }

    /// Binds `addr` and serves until SIGTERM or Ctrl-C.
    pub async fn run(self, addr: &str) -> Result<(), Error> {
        Server::bind(addr)?.serve(self).await
    }
}

/// An engine with the [`logger`](middleware::logger()) and
/// [`recovery`](middleware::recovery()) middlewares installed.
impl Default for Engine {
    fn default() -> Self {
        let mut engine = Self::new();
        engine
            .use_(middleware::logger())
            .use_(middleware::recovery());
        engine
    }
}
