//! The plugin capability.
//!
//! A plugin is one step of a [`Chain`](crate::Chain). It receives the
//! response sink, the request, and a [`Next`] continuation for the rest of
//! the chain, and picks one of three shapes:
//!
//! ```text
//! short-circuit   write a response, drop `next`          → nothing downstream runs
//! forward         next.run(w, req)                       → the normal case
//! wrap            before…; next.run(w, req); after…      → headers, timing, flushing
//! ```
//!
//! `Next::run` takes `self`, so a plugin can forward at most once.

use crate::chain::Next;
use crate::handler::Handler;
use crate::request::Request;
use crate::response::ResponseWriter;

pub(crate) type BoxedPlugin = Box<dyn Plugin>;

/// A middleware step that runs before, after, or instead of the rest of
/// its chain.
///
/// Implemented automatically for functions with the signature:
///
/// ```text
/// fn name(w: &mut dyn ResponseWriter, req: &Request, next: Next<'_>)
/// ```
///
/// Use [`plugin_fn`] for closures.
pub trait Plugin: Send + Sync + 'static {
    fn call(&self, w: &mut dyn ResponseWriter, req: &Request, next: Next<'_>);
}

impl<F> Plugin for F
where
    F: Fn(&mut dyn ResponseWriter, &Request, Next<'_>) + Send + Sync + 'static,
{
    fn call(&self, w: &mut dyn ResponseWriter, req: &Request, next: Next<'_>) {
        self(w, req, next)
    }
}

/// Pins a closure to the plugin signature.
///
/// ```rust
/// use http::header::{HeaderValue, SERVER};
/// use plait::{plugin_fn, Endpoint, Request, ResponseWriter};
///
/// fn hello(_: &mut dyn ResponseWriter, _: &Request) {}
///
/// let mut ep = Endpoint::new(hello);
/// ep.use_plugin(plugin_fn(|w, req, next| {
///     w.headers_mut().insert(SERVER, HeaderValue::from_static("plait"));
///     next.run(w, req);
/// }));
/// ```
pub fn plugin_fn<F>(f: F) -> F
where
    F: Fn(&mut dyn ResponseWriter, &Request, Next<'_>) + Send + Sync + 'static,
{
    f
}

/// A plain handler spliced into a chain: it always runs, then always
/// forwards. Built by the `use_handler` methods.
pub(crate) struct HandlerPlugin<H>(pub(crate) H);

impl<H: Handler> Plugin for HandlerPlugin<H> {
    fn call(&self, w: &mut dyn ResponseWriter, req: &Request, next: Next<'_>) {
        self.0.serve(w, req);
        next.run(w, req);
    }
}
