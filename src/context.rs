//! Per-request carrier pairing the request with its response sink.
//!
//! The server builds one [`Context`] per request at the router's entry point
//! and drops it when dispatch returns. It is owned by the worker handling that
//! request and never shared. Plugins that prefer one argument over two can be
//! written against it with [`context_plugin`].

use crate::chain::Next;
use crate::handler::Handler;
use crate::plugin::Plugin;
use crate::request::Request;
use crate::response::ResponseWriter;

pub struct Context<'a> {
    pub request: &'a Request,
    pub response: &'a mut dyn ResponseWriter,
}

impl<'a> Context<'a> {
    pub fn new(request: &'a Request, response: &'a mut dyn ResponseWriter) -> Self {
        Self { request, response }
    }

    /// Hands the request and the current sink to `handler`.
    pub fn dispatch(self, handler: &dyn Handler) {
        handler.serve(self.response, self.request);
    }

    /// Continues the chain with whatever sink this context now holds.
    pub fn forward(self, next: Next<'_>) {
        next.run(self.response, self.request);
    }
}

/// Adapts a single-argument closure into a [`Plugin`].
///
/// ```rust
/// use http::header::{HeaderValue, CACHE_CONTROL};
/// use plait::{context_plugin, Router};
///
/// let app = Router::new().wrap(context_plugin(|mut ctx, next| {
///     ctx.response.headers_mut().insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
///     ctx.forward(next);
/// }));
/// ```
pub fn context_plugin<F>(f: F) -> ContextPlugin<F>
where
    F: Fn(Context<'_>, Next<'_>) + Send + Sync + 'static,
{
    ContextPlugin(f)
}

pub struct ContextPlugin<F>(F);

impl<F> Plugin for ContextPlugin<F>
where
    F: Fn(Context<'_>, Next<'_>) + Send + Sync + 'static,
{
    fn call(&self, w: &mut dyn ResponseWriter, req: &Request, next: Next<'_>) {
        (self.0)(Context::new(req, w), next)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use http::Method;

    use super::*;
    use crate::handler::handler_fn;
    use crate::response::Response;
    use crate::router::Router;

    #[test]
    fn swapped_sink_is_seen_downstream_only() {
        let router = Router::new()
            .get("/", handler_fn(|w, _| {
                let _ = w.write_all(b"body");
            }))
            .wrap(context_plugin(|ctx, next| {
                let Context { request, response } = ctx;
                let mut side = Response::new();
                Context::new(request, &mut side).forward(next);
                assert_eq!(side.body(), b"body");
                let _ = response.write_all(b"replaced");
            }));

        let req = Request::new(Method::GET, "/");
        let mut res = Response::new();
        Context::new(&req, &mut res).dispatch(&router);
        assert_eq!(res.body(), b"replaced");
    }
}
