//! Built-in plugins.
//!
//! Plugins are the right place for cross-cutting concerns: structured
//! tracing, compression, request-id injection, and authentication-header
//! inspection. Attach them with [`Router::wrap`](crate::Router::wrap) for
//! every request or [`Router::plug`](crate::Router::plug) for one route.
//!
//! - [`Trace`] — per-request span with method, path, status, latency
//! - [`Compression`] — gzip / deflate response bodies from a shared
//!   [`CompressorPool`]

pub mod compression;
mod pool;
mod trace;

pub use compression::{Compression, Encoding};
pub use pool::{CompressorPool, PooledCompressor};
pub use trace::Trace;
