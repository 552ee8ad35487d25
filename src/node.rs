//! Per-path, per-method handlers and plugin chains.

use std::collections::HashMap;
use std::fmt;

use http::Method;
use tracing::debug;

use crate::chain::Chain;
use crate::handler::{BoxedHandler, Handler};
use crate::plugin::{HandlerPlugin, Plugin};
use crate::request::Request;
use crate::response::ResponseWriter;

/// Everything registered under one path pattern.
///
/// Holds at most one handler and one chain per HTTP method. A chain may be
/// attached before its handler; it is only ever consulted once a handler for
/// the method exists.
pub struct Node {
    path: String,
    handlers: HashMap<Method, BoxedHandler>,
    chains: HashMap<Method, Chain>,
}

impl Node {
    pub(crate) fn new(path: &str) -> Self {
        Self { path: path.to_owned(), handlers: HashMap::new(), chains: HashMap::new() }
    }

    /// The pattern this node was registered under.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Binds `handler` to `method`, replacing any previous one. The method's
    /// chain, if any, is kept.
    pub fn handle(&mut self, method: Method, handler: impl Handler) -> &mut Self {
        self.handlers.insert(method, Box::new(handler));
        self
    }

    /// Attaches `plugin` to the chain for `method`, creating the chain on
    /// first use. The method's handler still runs last.
    pub fn use_plugin(&mut self, method: Method, plugin: impl Plugin) -> &mut Self {
        self.chains.entry(method).or_default().append(plugin);
        self
    }

    /// Splices `handler` into the chain for `method` as a step that always
    /// runs and always forwards.
    pub fn use_handler(&mut self, method: Method, handler: impl Handler) -> &mut Self {
        self.use_plugin(method, HandlerPlugin(handler))
    }

    pub fn has_handler(&self, method: &Method) -> bool {
        self.handlers.contains_key(method)
    }

    /// Number of plugins attached to `method`.
    pub fn chain_len(&self, method: &Method) -> usize {
        self.chains.get(method).map_or(0, Chain::len)
    }

    /// Dispatches by request method.
    ///
    /// With no handler for the method, `fallback` answers and no chain runs.
    /// Otherwise the method's chain runs with the handler as its final step,
    /// or the handler runs directly when the chain is absent or empty.
    pub fn dispatch(&self, fallback: &dyn Handler, w: &mut dyn ResponseWriter, req: &Request) {
        let Some(handler) = self.handlers.get(req.method()) else {
            debug!(path = %self.path, method = %req.method(), "no handler for method, using fallback");
            fallback.serve(w, req);
            return;
        };

        match self.chains.get(req.method()) {
            Some(chain) if !chain.is_empty() => chain.run_with(&**handler, w, req),
            _ => handler.serve(w, req),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("path", &self.path)
            .field("methods", &self.handlers.keys().collect::<Vec<_>>())
            .field("chains", &self.chains)
            .finish()
    }
}
