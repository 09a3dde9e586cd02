//! Minimal cob example: parameters, wildcards, groups, middleware, binding
//! and sessions.
//!
//! Run with:
//!   cargo run --example basic
//!
//! Logs at `info` by default; set `RUST_LOG` to change that.
//!
//! Try:
//!   curl http://localhost:9999/hello/cob
//!   curl http://localhost:9999/assets/css/site.css
//!   curl http://localhost:9999/v1/users/42
//!   curl -X POST http://localhost:9999/v1/login -d 'name=alice&age=30'
//!   curl -c jar -b jar http://localhost:9999/visits

use cob::sessions::{self, MemoryStore};
use cob::{Context, Engine};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Deserialize, Serialize)]
struct Login {
    name: String,
    age: u32,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut engine = Engine::default();
    engine
        .use_(sessions::sessions("cob_session", MemoryStore::default()))
        .get("/hello/:name", hello)
        .get("/assets/*filepath", asset)
        .get("/visits", visits);

    let mut v1 = engine.group("/v1");
    v1.use_(trace)
        .get("/users/:id", get_user)
        .post("/login", login);

    if let Err(e) = engine.run("0.0.0.0:9999").await {
        eprintln!("server error: {e}");
    }
}

// GET /hello/:name
fn hello(c: &mut Context) {
    let name = c.param("name").unwrap_or_default().to_owned();
    c.string(200, format_args!("hello {name}\n"));
}

// GET /assets/*filepath
fn asset(c: &mut Context) {
    let filepath = c.param("filepath").unwrap_or_default().to_owned();
    c.json(200, &serde_json::json!({ "filepath": filepath }));
}

// Middleware for /v1: tags every response, before and after the handler.
fn trace(c: &mut Context) {
    c.set_header("x-trace", "1");
    c.next();
    tracing::debug!(status = c.writer.status(), "v1 request done");
}

// GET /v1/users/:id
fn get_user(c: &mut Context) {
    let id = c.param("id").unwrap_or_default().to_owned();
    c.json(200, &serde_json::json!({ "id": id, "name": "alice" }));
}

// POST /v1/login, bound from a form or JSON body by Content-Type.
fn login(c: &mut Context) {
    match c.bind::<Login>() {
        Ok(login) => c.json(200, &login),
        Err(e) => c.fail(400, e.to_string()),
    }
}

// GET /visits: a per-browser counter kept in the session.
fn visits(c: &mut Context) {
    let session = sessions::default_session(c);
    let count = session.get("count").and_then(|v| v.as_u64()).unwrap_or(0) + 1;
    session.set("count", count);
    if let Err(e) = session.save(c) {
        c.fail(500, e.to_string());
        return;
    }
    c.string(200, format_args!("visit #{count}\n"));
}
