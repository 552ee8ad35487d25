//! A single handler with its own plugin chain.

use crate::chain::Chain;
use crate::handler::Handler;
use crate::plugin::{HandlerPlugin, Plugin};
use crate::request::Request;
use crate::response::ResponseWriter;

/// One bound handler plus one [`Chain`], with no per-method distinction.
///
/// The handler always runs last, exactly once per dispatch, after every
/// attached plugin that forwards. An `Endpoint` is itself a [`Handler`], so it
/// can be registered on a route like any function:
///
/// ```rust
/// use plait::{plugin_fn, Endpoint, Request, ResponseWriter, ResponseWriterExt, Router};
///
/// fn report(w: &mut dyn ResponseWriter, _: &Request) { w.text("ok") }
///
/// let mut ep = Endpoint::new(report);
/// ep.use_plugin(plugin_fn(|w, req, next| next.run(w, req)));
///
/// let app = Router::new().get("/report", ep);
/// ```
pub struct Endpoint<H> {
    handler: H,
    chain: Chain,
}

impl<H: Handler> Endpoint<H> {
    pub fn new(handler: H) -> Self {
        Self { handler, chain: Chain::new() }
    }

    /// Attaches `plugin` after the plugins already attached and before the
    /// handler.
    pub fn use_plugin(&mut self, plugin: impl Plugin) -> &mut Self {
        self.chain.append(plugin);
        self
    }

    /// Splices `handler` into the chain as a step that always runs and
    /// always forwards.
    pub fn use_handler(&mut self, handler: impl Handler) -> &mut Self {
        self.use_plugin(HandlerPlugin(handler))
    }

    /// Number of attached plugins.
    pub fn chain_len(&self) -> usize {
        self.chain.len()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub(crate) fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn dispatch(&self, w: &mut dyn ResponseWriter, req: &Request) {
        if self.chain.is_empty() {
            self.handler.serve(w, req);
        } else {
            self.chain.run_with(&self.handler, w, req);
        }
    }
}

impl<H: Handler> Handler for Endpoint<H> {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) {
        self.dispatch(w, req);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::Method;
    use parking_lot::Mutex;

    use super::*;
    use crate::chain::tests::{forwarding, recording, Calls};
    use crate::handler::handler_fn;
    use crate::plugin::plugin_fn;
    use crate::response::Response;

    fn get() -> Request {
        Request::new(Method::GET, "/")
    }

    #[test]
    fn handler_runs_after_plugin() {
        let result = Arc::new(Mutex::new(String::new()));
        let result2 = Arc::new(Mutex::new(String::new()));

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

        let mut ep = Endpoint::new(handler);
        ep.use_plugin(plugin);
        ep.dispatch(&mut Response::new(), &get());

        assert_eq!(*result.lock(), "A");
        assert_eq!(*result2.lock(), "B");
    }

    #[test]
    fn zero_plugins_calls_handler_directly() {
        let calls = Calls::default();
        let ep = Endpoint::new(recording(&calls, "H"));
        assert_eq!(ep.chain_len(), 0);

        ep.dispatch(&mut Response::new(), &get());
        assert_eq!(*calls.lock(), ["H"]);
    }

    #[test]
    fn handler_runs_once_however_many_plugins_are_attached() {
        let calls = Calls::default();
        let mut ep = Endpoint::new(recording(&calls, "H"));
        ep.use_plugin(forwarding(&calls, "p1"));
        ep.dispatch(&mut Response::new(), &get());
        ep.use_plugin(forwarding(&calls, "p2")).use_plugin(forwarding(&calls, "p3"));
        calls.lock().clear();

        ep.dispatch(&mut Response::new(), &get());
        assert_eq!(*calls.lock(), ["p1", "p2", "p3", "H"]);
    }

    #[test]
    fn use_handler_runs_inline_and_forwards() {
        let calls = Calls::default();
        let mut ep = Endpoint::new(recording(&calls, "H"));
        ep.use_plugin(forwarding(&calls, "p1"))
            .use_handler(recording(&calls, "audit"))
            .use_plugin(forwarding(&calls, "p2"));

        ep.dispatch(&mut Response::new(), &get());
        assert_eq!(*calls.lock(), ["p1", "audit", "p2", "H"]);
    }
}
