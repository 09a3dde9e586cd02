//! Method-aware request router.
//!
//! One prefix tree per HTTP method, plus the handler registered for each
//! `METHOD-pattern` key. The router never runs a chain on its own: it
//! appends the matched handler (or the 404 handler) to the context's chain
//! and hands control back through [`Context::next`].

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::context::Context;
use crate::handler::HandlerFunc;
use crate::method::Method;
use crate::tree::{Judgement, Node, parse_pattern};

pub(crate) struct Router {
    roots: HashMap<Method, Node>,
    handlers: HashMap<String, HandlerFunc>,
    not_found: HandlerFunc,
}

impl Router {
    pub(crate) fn new() -> Self {
        Self {
            roots: HashMap::new(),
            handlers: HashMap::new(),
            not_found: Arc::new(not_found),
        }
    }

    /// Registers `handler` for `method` + `pattern`.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` does not begin with `/`, or if an equivalent
    /// pattern is already registered for `method`. Routes are built once at
    /// startup, so both are programming errors.
    pub(crate) fn add_route(&mut self, method: Method, pattern: &str, handler: HandlerFunc) {
        if !pattern.starts_with('/') {
            panic!("invalid route `{pattern}`: pattern must begin with '/'");
        }

        let parts = parse_pattern(pattern);
        let root = self.roots.entry(method).or_default();
        match root.judge(&parts, 0) {
            Judgement::Duplicate(existing) => {
                panic!("invalid route `{method} {pattern}`: conflicts with `{existing}`")
            }
            Judgement::Overlap(with) => {
                debug!(%method, pattern, sibling = with, "route overlaps a sibling segment");
            }
            Judgement::Fresh => {}
        }
        root.insert(pattern, &parts, 0);

        debug!(%method, pattern, "route registered");
        self.handlers.insert(route_key(method, pattern), handler);
    }

    /// Resolves `path` to its terminal node and the captured parameters.
    pub(crate) fn get_route(
        &self,
        method: Method,
        path: &str,
    ) -> Option<(&Node, HashMap<String, String>)> {
        let search_parts = parse_pattern(path);
        let root = self.roots.get(&method)?;
        let node = root.search(&search_parts, 0)?;

        let mut params = HashMap::new();
        for (index, part) in parse_pattern(node.pattern()).into_iter().enumerate() {
            if let Some(name) = part.strip_prefix(':') {
                params.insert(name.to_owned(), search_parts[index].to_owned());
            }
            if let Some(name) = part.strip_prefix('*') {
                if !name.is_empty() {
                    params.insert(name.to_owned(), search_parts[index..].join("/"));
                }
                break;
            }
        }
        Some((node, params))
    }

    /// Appends the handler for the context's request to its chain and runs
    /// the chain.
    pub(crate) fn handle(&self, c: &mut Context) {
        let matched = Method::from_http(c.method()).and_then(|method| {
            let (node, params) = self.get_route(method, c.path())?;
            let handler = self.handlers.get(&route_key(method, node.pattern()))?;
            Some((params, Arc::clone(handler)))
        });

        match matched {
            Some((params, handler)) => {
                c.params = params;
                c.handlers.push(handler);
            }
            None => c.handlers.push(Arc::clone(&self.not_found)),
        }
        c.next();
    }
}

fn route_key(method: Method, pattern: &str) -> String {
    format!("{method}-{pattern}")
}

fn not_found(c: &mut Context) {
    let path = c.path().to_owned();
    c.string(404, format_args!("404 NOT FOUND: {path}"));
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::handler::Handler;

    fn noop(_: &mut Context) {}

    fn router() -> Router {
        let mut r = Router::new();
        r.add_route(Method::Get, "/", noop.into_handler_func());
        r.add_route(Method::Get, "/hello/:name", noop.into_handler_func());
        r.add_route(Method::Get, "/hello/b/c", noop.into_handler_func());
        r.add_route(Method::Get, "/hi/:name", noop.into_handler_func());
        r.add_route(Method::Get, "/assets/*filepath", noop.into_handler_func());
        r
    }

    #[test]
    fn get_route_extracts_named_params() {
        let r = router();
        let (node, params) = r.get_route(Method::Get, "/hello/cob").unwrap();
        assert_eq!(node.pattern(), "/hello/:name");
        assert_eq!(params.len(), 1);
        assert_eq!(params["name"], "cob");
    }

    #[test]
    fn get_route_joins_wildcard_tail() {
        let r = router();
        let (node, params) = r.get_route(Method::Get, "/assets/css/site.css").unwrap();
        assert_eq!(node.pattern(), "/assets/*filepath");
        assert_eq!(params["filepath"], "css/site.css");
    }

    #[test]
    fn get_route_prefers_static_segments() {
        let r = router();
        let (node, params) = r.get_route(Method::Get, "/hello/b/c").unwrap();
        assert_eq!(node.pattern(), "/hello/b/c");
        assert!(params.is_empty());
    }

    #[test]
    fn routes_are_isolated_per_method() {
        let r = router();
        assert!(r.get_route(Method::Get, "/hi/x").is_some());
        assert!(r.get_route(Method::Post, "/hi/x").is_none());
    }

    #[test]
    #[should_panic(expected = "conflicts with `/hello/:name`")]
    fn duplicate_shape_is_rejected() {
        let mut r = router();
        r.add_route(Method::Get, "/hello/:other", noop.into_handler_func());
    }

    #[test]
    #[should_panic(expected = "must begin with '/'")]
    fn pattern_without_leading_slash_is_rejected() {
        Router::new().add_route(Method::Get, "hello", noop.into_handler_func());
    }

    #[test]
    fn unmatched_request_gets_404_body() {
        let r = router();
        let req = http::Request::get("/nope").body(Bytes::new()).unwrap();
        let mut c = Context::new(req.into());
        r.handle(&mut c);
        let res = c.finish();
        assert_eq!(res.status(), 404);
        assert_eq!(res.body().as_ref(), b"404 NOT FOUND: /nope");
    }
}
