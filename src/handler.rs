//! Handler trait and type erasure.
//!
//! # How handlers are stored
//!
//! A [`Node`](crate::Node) keeps one handler per HTTP method, and every one of
//! them is a different concrete type. Rust collections hold one type, so
//! handlers are boxed as **trait objects** (`Box<dyn Handler>`) and dispatched
//! through a single vtable call:
//!
//! ```text
//! fn hello(w: &mut dyn ResponseWriter, req: &Request) { … }  ← user writes this
//!        ↓ router.get("/", hello)
//! Box::new(hello) as BoxedHandler                           ← stored per method
//!        ↓
//! handler.serve(w, req)  at request time                    ← one vtable dispatch
//! ```
//!
//! Handlers are synchronous. The server runs each dispatch on a blocking
//! worker, so a handler may block without stalling the connection loop.

use crate::request::Request;
use crate::response::ResponseWriter;

/// A heap-allocated, type-erased handler shared across concurrent requests.
pub(crate) type BoxedHandler = Box<dyn Handler>;

/// Anything that can answer a request by writing to a response sink.
///
/// Implemented automatically for every function with the signature:
///
/// ```text
/// fn name(w: &mut dyn ResponseWriter, req: &Request)
/// ```
///
/// Closures need [`handler_fn`] so the compiler can infer their argument
/// types. [`Router`](crate::Router), [`Node`](crate::Node)-backed routes and
/// [`Endpoint`](crate::Endpoint) all implement `Handler` too, so a whole
/// routing tree can be mounted wherever a handler is accepted.
pub trait Handler: Send + Sync + 'static {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request);
}

impl<F> Handler for F
where
    F: Fn(&mut dyn ResponseWriter, &Request) + Send + Sync + 'static,
{
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) {
        self(w, req)
    }
}

/// Pins a closure to the handler signature.
///
/// ```rust
/// use plait::{handler_fn, ResponseWriterExt, Router};
///
/// let greeting = String::from("hi");
/// let app = Router::new().get("/", handler_fn(move |w, _| w.text(&greeting)));
/// ```
pub fn handler_fn<F>(f: F) -> F
where
    F: Fn(&mut dyn ResponseWriter, &Request) + Send + Sync + 'static,
{
    f
}

/// Built-in fallback handlers for [`Router::fallback`](crate::Router::fallback).
pub mod fallback {
    use http::StatusCode;

    use crate::request::Request;
    use crate::response::{ResponseWriter, ResponseWriterExt};

    /// `404 Not Found`. The router's default for unknown paths.
    pub fn not_found(w: &mut dyn ResponseWriter, _req: &Request) {
        w.set_status(StatusCode::NOT_FOUND);
        w.text("not found");
    }

    /// `501 Not Implemented`. The router's default for a known path with no
    /// handler for the request method.
    pub fn not_implemented(w: &mut dyn ResponseWriter, _req: &Request) {
        w.set_status(StatusCode::NOT_IMPLEMENTED);
        w.text("not implemented");
    }
}
