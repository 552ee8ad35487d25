//! # plait
//!
//! Synchronous HTTP routing with plugin chains at three granularities:
//! the whole router, one path + method, or one handler.
//!
//! ## The contract
//!
//! A handler writes a response: `fn(&mut dyn ResponseWriter, &Request)`.
//! A plugin gets the same two arguments plus [`Next`], the rest of its chain,
//! and decides what happens to it:
//!
//! - **short-circuit** — drop `next`; nothing downstream runs
//! - **forward** — `next.run(w, req)`
//! - **wrap** — work, `next.run(w, req)`, more work after it returns
//!
//! Plugins run in the order they were attached. The route's handler always
//! runs last, exactly once, after every plugin that forwarded.
//!
//! What plait leaves to the proxy in front of it: TLS, load balancing,
//! response caching, load shedding.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::{Method, StatusCode};
//! use plait::middleware::{Compression, Trace};
//! use plait::{Next, Request, ResponseWriter, ResponseWriterExt, Router, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .wrap(Trace::new())
//!         .wrap(Compression::new())
//!         .on(Method::GET,  "/users/{id}", get_user)
//!         .on(Method::POST, "/users",      create_user)
//!         .plug(Method::POST, "/users", require_token);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! fn get_user(w: &mut dyn ResponseWriter, req: &Request) {
//!     let id = req.param("id").unwrap_or("unknown");
//!     w.json(format!(r#"{{"id":"{id}"}}"#).as_bytes());
//! }
//!
//! fn create_user(w: &mut dyn ResponseWriter, req: &Request) {
//!     if req.body().is_empty() {
//!         return w.status_only(StatusCode::BAD_REQUEST);
//!     }
//!     w.set_status(StatusCode::CREATED);
//!     w.json(br#"{"id":"99"}"#);
//! }
//!
//! fn require_token(w: &mut dyn ResponseWriter, req: &Request, next: Next<'_>) {
//!     match req.header("authorization") {
//!         Some(_) => next.run(w, req),
//!         None => w.status_only(StatusCode::UNAUTHORIZED),
//!     }
//! }
//! ```

mod chain;
mod context;
mod endpoint;
mod error;
mod handler;
mod logger;
mod node;
mod plugin;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;

pub use chain::{Chain, Next};
pub use context::{context_plugin, Context, ContextPlugin};
pub use endpoint::Endpoint;
pub use error::Error;
pub use handler::{fallback, handler_fn, Handler};
pub use logger::{Level, Logger};
pub use node::Node;
pub use plugin::{plugin_fn, Plugin};
pub use request::Request;
pub use response::{ContentType, Response, ResponseWriter, ResponseWriterExt};
pub use router::Router;
pub use server::Server;
