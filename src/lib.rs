//! # cob
//!
//! A minimalist HTTP framework: a prefix-tree router, route groups, and an
//! onion-style middleware chain driven by a per-request [`Context`].
//!
//! ## The pieces
//!
//! - **Routing**: one prefix tree per method. Patterns are made of static
//!   segments, named parameters (`:name`) and a terminal wildcard
//!   (`*name`). Static segments always win over parameters.
//! - **Groups**: a path prefix with its own middlewares. A request runs the
//!   middlewares of every group whose prefix starts its path, in the order
//!   the groups were created.
//! - **Chain**: middlewares and the route handler share one signature,
//!   `fn(&mut Context)`. Calling [`Context::next`] runs the rest of the
//!   chain; [`Context::fail`] stops it.
//!
//! The server reads each request body in full and runs the chain on tokio's
//! blocking pool, so handlers are plain synchronous functions.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use cob::{Context, Engine};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Login {
//!     name: String,
//!     age: u32,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), cob::Error> {
//!     let mut engine = Engine::default();
//!     engine.get("/hello/:name", hello);
//!
//!     let mut api = engine.group("/api");
//!     api.use_(trace).post("/login", login);
//!
//!     engine.run("0.0.0.0:9999").await
//! }
//!
//! fn hello(c: &mut Context) {
//!     let name = c.param("name").unwrap_or_default().to_owned();
//!     c.string(200, format_args!("hello {name}\n"));
//! }
//!
//! fn trace(c: &mut Context) {
//!     c.set_header("x-trace", "1");
//!     c.next();
//! }
//!
//! fn login(c: &mut Context) {
//!     match c.bind::<Login>() {
//!         Ok(login) => c.json(200, &serde_json::json!({ "name": login.name, "age": login.age })),
//!         Err(e) => c.fail(400, e.to_string()),
//!     }
//! }
//! ```

mod context;
mod engine;
mod error;
mod group;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;
mod tree;

pub mod binding;
pub mod middleware;
pub mod sessions;

pub use context::Context;
pub use engine::{DEFAULT_MAX_BODY_SIZE, Engine};
pub use error::{BindError, Error};
pub use group::RouterGroup;
pub use handler::{Handler, HandlerFunc};
pub use method::Method;
pub use request::Request;
pub use response::ResponseWriter;
pub use server::Server;
