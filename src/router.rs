//! Radix-tree request router with plugin chains.
//!
//! Three places accept plugins:
//!
//! ```text
//! Router::wrap           every request, before path resolution
//! Router::plug(m, p, …)  one method on one path, before its handler
//! Endpoint::use_plugin   one handler, wherever it is mounted
//! ```
//!
//! A request flows: router-wide chain → path lookup (matchit, O(path-length))
//! → [`Node`] → method chain → handler. Unknown paths and unregistered methods
//! both end at the fallback handler.
//!
//! Build the router once at startup and hand it to
//! [`Server::serve`](crate::Server::serve). The server moves it into an `Arc`,
//! so nothing can register routes or plugins while requests are being served.

use std::collections::HashMap;

use http::Method;
use matchit::Router as MatchitRouter;
use tracing::{debug, trace};

use crate::endpoint::Endpoint;
use crate::error::Error;
use crate::handler::{fallback, BoxedHandler, Handler};
use crate::node::Node;
use crate::plugin::Plugin;
use crate::request::Request;
use crate::response::ResponseWriter;

/// The application router.
///
/// Each registration method takes and returns `self`, so registrations chain
/// naturally:
///
/// ```rust
/// use http::Method;
/// use plait::{middleware::Trace, Next, Request, ResponseWriter, ResponseWriterExt, Router};
///
/// fn get_user(w: &mut dyn ResponseWriter, req: &Request) {
///     w.text(req.param("id").unwrap_or("unknown"));
/// }
///
/// fn require_token(w: &mut dyn ResponseWriter, req: &Request, next: Next<'_>) {
///     if req.header("authorization").is_some() {
///         next.run(w, req);
///     } else {
///         w.set_status(http::StatusCode::UNAUTHORIZED);
///     }
/// }
///
/// let app = Router::new()
///     .wrap(Trace::new())
///     .get("/users/{id}", get_user)
///     .plug(Method::GET, "/users/{id}", require_token);
/// ```
pub struct Router {
    endpoint: Endpoint<PathTable>,
}

impl Router {
    pub fn new() -> Self {
        Self { endpoint: Endpoint::new(PathTable::new()) }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid pattern or conflicts with an existing
    /// one. Use [`Router::node`] to handle that as an error.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.at(path).handle(method, handler);
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PUT, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::DELETE, path, handler)
    }

    /// Attach a plugin to one method on one path. Plugins run in the order
    /// they were attached, then the handler.
    ///
    /// # Panics
    ///
    /// Same conditions as [`Router::on`].
    pub fn plug(mut self, method: Method, path: &str, plugin: impl Plugin) -> Self {
        self.at(path).use_plugin(method, plugin);
        self
    }

    /// Splice a plain handler into one method's chain; it always forwards.
    pub fn plug_handler(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.at(path).use_handler(method, handler);
        self
    }

    /// Attach a plugin that sees every request, before path resolution.
    /// Path parameters are not yet available to it.
    pub fn wrap(mut self, plugin: impl Plugin) -> Self {
        self.endpoint.use_plugin(plugin);
        self
    }

    /// Splice a plain handler into the router-wide chain; it always forwards.
    pub fn wrap_handler(mut self, handler: impl Handler) -> Self {
        self.endpoint.use_handler(handler);
        self
    }

    /// Replace the handler used for unknown paths and unregistered methods.
    ///
    /// Until one is set, unknown paths get [`fallback::not_found`] and
    /// unregistered methods on a known path get [`fallback::not_implemented`].
    pub fn fallback(mut self, handler: impl Handler) -> Self {
        self.endpoint.handler_mut().fallback = Some(Box::new(handler));
        self
    }

    /// The node for `path`, created on first use.
    pub fn node(&mut self, path: &str) -> Result<&mut Node, Error> {
        self.endpoint.handler_mut().node(path)
    }

    /// The node a concrete request path resolves to, if any.
    pub fn find(&self, path: &str) -> Option<&Node> {
        self.endpoint.handler().resolve(path).map(|(node, _)| node)
    }

    pub fn dispatch(&self, w: &mut dyn ResponseWriter, req: &Request) {
        self.endpoint.dispatch(w, req);
    }

    fn at(&mut self, path: &str) -> &mut Node {
        self.node(path).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

impl Handler for Router {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) {
        self.dispatch(w, req);
    }
}

// ── Path table ────────────────────────────────────────────────────────────────

/// Pattern → [`Node`] mapping plus the user's fallback handler, if any. The
/// terminal step of the router-wide chain.
struct PathTable {
    tree: MatchitRouter<usize>,
    nodes: Vec<Node>,
    patterns: HashMap<String, usize>,
    fallback: Option<BoxedHandler>,
}

impl PathTable {
    fn new() -> Self {
        Self {
            tree: MatchitRouter::new(),
            nodes: Vec::new(),
            patterns: HashMap::new(),
            fallback: None,
        }
    }

    fn node(&mut self, path: &str) -> Result<&mut Node, Error> {
        if let Some(&idx) = self.patterns.get(path) {
            return Ok(&mut self.nodes[idx]);
        }

        let idx = self.nodes.len();
        self.tree.insert(path, idx).map_err(|e| Error::InvalidRoute {
            path: path.to_owned(),
            reason: e.to_string(),
        })?;
        self.patterns.insert(path.to_owned(), idx);
        self.nodes.push(Node::new(path));
        debug!(path, "route registered");
        Ok(&mut self.nodes[idx])
    }

    fn resolve(&self, path: &str) -> Option<(&Node, HashMap<String, String>)> {
        let matched = self.tree.at(path).ok()?;
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((&self.nodes[*matched.value], params))
    }
}

impl Handler for PathTable {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) {
        match self.resolve(req.path()) {
            Some((node, params)) => {
                let unregistered = self.fallback.as_deref().unwrap_or(&fallback::not_implemented);
                match req.set_params(params) {
                    Ok(()) => node.dispatch(unregistered, w, req),
                    // Mounted under another router: this route's params win.
                    Err(params) => node.dispatch(unregistered, w, &req.rescoped(params)),
                }
            }
            None => {
                trace!(path = req.path(), "no route, using fallback");
                match &self.fallback {
                    Some(handler) => handler.serve(w, req),
                    None => fallback::not_found(w, req),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::StatusCode;
    use parking_lot::Mutex;

    use super::*;
    use crate::chain::tests::{forwarding, recording, Calls};
    use crate::handler::handler_fn;
    use crate::plugin::plugin_fn;
    use crate::response::{Response, ResponseWriterExt};

    fn send(router: &Router, method: Method, path: &str) -> Response {
        let mut res = Response::new();
        router.dispatch(&mut res, &Request::new(method, path));
        res
    }

    #[test]
    fn registered_route_runs_plugin_then_handler() {
        let result = Arc::new(Mutex::new(String::new()));
        let result2 = Arc::new(Mutex::new(String::new()));
        let fallback_hits = Calls::default();

        let handler = {
            let result = Arc::clone(&result);
            handler_fn(move |_, _| *result.lock() = "A".to_owned())
        };
        let plugin = {
            let result2 = Arc::clone(&result2);
            plugin_fn(move |w, req, next| {
                *result2.lock() = "B".to_owned();
                next.run(w, req);
            })
        };
        let router = Router::new()
            .get("/x", handler)
            .plug(Method::GET, "/x", plugin)
            .fallback(recording(&fallback_hits, "fallback"));

        send(&router, Method::GET, "/x");
        assert_eq!(*result.lock(), "A");
        assert_eq!(*result2.lock(), "B");

        result.lock().clear();
        result2.lock().clear();
        send(&router, Method::POST, "/x");
        assert_eq!(*result.lock(), "");
        assert_eq!(*result2.lock(), "");
        assert_eq!(*fallback_hits.lock(), ["fallback"]);
    }

    #[test]
    fn unknown_path_gets_default_not_found() {
        let router = Router::new().get("/x", handler_fn(|w, _| w.text("x")));

        let res = send(&router, Method::GET, "/nope");
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn path_params_reach_plugins_and_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let plugin = {
            let seen = Arc::clone(&seen);
            plugin_fn(move |w, req, next| {
                seen.lock().push(req.param("id").map(str::to_owned));
                next.run(w, req);
            })
        };
        let router = Router::new()
            .get("/users/{id}", handler_fn(|w, req| w.text(req.param("id").unwrap_or("?"))))
            .plug(Method::GET, "/users/{id}", plugin);

        let res = send(&router, Method::GET, "/users/42");
        assert_eq!(res.body(), b"42");
        assert_eq!(*seen.lock(), [Some("42".to_owned())]);
    }

    #[test]
    fn router_wide_plugins_run_first_even_for_unknown_paths() {
        let calls = Calls::default();
        let router = Router::new()
            .wrap(forwarding(&calls, "global"))
            .on(Method::GET, "/x", recording(&calls, "H"))
            .plug(Method::GET, "/x", forwarding(&calls, "local"))
            .fallback(recording(&calls, "fallback"));

        send(&router, Method::GET, "/x");
        assert_eq!(*calls.lock(), ["global", "local", "H"]);

        calls.lock().clear();
        send(&router, Method::GET, "/missing");
        assert_eq!(*calls.lock(), ["global", "fallback"]);
    }

    #[test]
    fn router_wide_plugin_can_short_circuit() {
        let calls = Calls::default();
        let gate = plugin_fn(|w, _, _| w.set_status(StatusCode::SERVICE_UNAVAILABLE));
        let router = Router::new().wrap(gate).get("/x", recording(&calls, "H"));

        let res = send(&router, Method::GET, "/x");
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(calls.lock().is_empty());
    }

    #[test]
    fn re_registering_a_pattern_reuses_its_node() {
        let calls = Calls::default();
        let mut router = Router::new()
            .get("/x", recording(&calls, "get"))
            .post("/x", recording(&calls, "post"));

        let node = router.node("/x").expect("valid route");
        assert!(node.has_handler(&Method::GET));
        assert!(node.has_handler(&Method::POST));
        assert_eq!(router.find("/x").map(Node::path), Some("/x"));
    }

    #[test]
    fn conflicting_pattern_is_an_error() {
        let mut router = Router::new().get("/users/{id}", handler_fn(|_, _| {}));

        let err = router.node("/users/{name}").expect_err("conflicting route");
        assert!(matches!(err, Error::InvalidRoute { ref path, .. } if path == "/users/{name}"));
    }

    #[test]
    fn unregistered_method_defaults_to_not_implemented() {
        let router = Router::new().get("/x", handler_fn(|w, _| w.text("x")));

        let res = send(&router, Method::DELETE, "/x");
        assert_eq!(res.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[test]
    fn custom_fallback_covers_unknown_paths_and_methods() {
        let calls = Calls::default();
        let router = Router::new()
            .get("/x", handler_fn(|w, _| w.text("x")))
            .fallback(recording(&calls, "fallback"));

        send(&router, Method::DELETE, "/x");
        send(&router, Method::GET, "/nope");
        assert_eq!(*calls.lock(), ["fallback", "fallback"]);
    }

    #[test]
    fn mounted_router_sees_its_own_params() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let outer_plugin = {
            let seen = Arc::clone(&seen);
            plugin_fn(move |w, req, next| {
                seen.lock().push(req.param("id").map(str::to_owned));
                next.run(w, req);
            })
        };
        let inner = Router::new()
            .get("/api/{name}", handler_fn(|w, req| {
                let name = req.param("name").unwrap_or("missing");
                let id = req.param("id").unwrap_or("none");
                w.text(&format!("{name}/{id}"));
            }));
        let outer = Router::new()
            .get("/api/{id}", inner)
            .plug(Method::GET, "/api/{id}", outer_plugin);

        let res = send(&outer, Method::GET, "/api/7");
        assert_eq!(res.body(), b"7/none");
        assert_eq!(*seen.lock(), [Some("7".to_owned())]);
    }
}
