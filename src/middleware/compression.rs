//! gzip / deflate response compression.
//!
//! The plugin negotiates an encoding from `Accept-Encoding`, then hands the
//! rest of the chain a compressing writer in place of the response sink it
//! received. Only the downstream steps see the substitution; once they
//! return, the plugin finishes the stream through the wrapped sink.

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use http::header::{
    HeaderMap, HeaderValue, ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, VARY,
};
use http::StatusCode;
use tracing::{error, warn};

use super::pool::{CompressorPool, PooledCompressor};
use crate::chain::Next;
use crate::plugin::Plugin;
use crate::request::Request;
use crate::response::ResponseWriter;

/// A supported content-coding.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Encoding {
    Gzip,
    Deflate,
}

impl Encoding {
    /// The `Content-Encoding` token.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gzip    => "gzip",
            Self::Deflate => "deflate",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("gzip") {
            Some(Self::Gzip)
        } else if token.eq_ignore_ascii_case("deflate") {
            Some(Self::Deflate)
        } else {
            None
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Picks the first supported coding in header order. Entries weighted
/// `q=0` are refused and skipped.
fn negotiate(accept: &str) -> Option<Encoding> {
    accept.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let token = parts.next()?.trim();
        let refused = parts.any(|param| {
            param.trim()
                .strip_prefix("q=")
                .and_then(|q| q.trim().parse::<f32>().ok())
                .is_some_and(|q| q == 0.0)
        });
        if refused { None } else { Encoding::from_token(token) }
    })
}

/// Compresses response bodies for clients that accept gzip or deflate.
///
/// Always adds `Vary: Accept-Encoding`. When an encoding is negotiated it
/// sets `Content-Encoding`, drops any `Content-Length`, and compresses every
/// body byte written downstream. A response that ends up with no body at all
/// (`204`, `304`, `HEAD`) goes out without `Content-Encoding`. If the pool is
/// exhausted the request is answered with `503 Service Unavailable` and
/// nothing downstream runs.
///
/// ```rust
/// use std::sync::Arc;
/// use plait::middleware::{Compression, CompressorPool};
/// use plait::Router;
///
/// let pool = Arc::new(CompressorPool::with_limit(256));
/// let app = Router::new().wrap(Compression::with_pool(pool));
/// ```
pub struct Compression {
    pool: Arc<CompressorPool>,
}

impl Compression {
    pub fn new() -> Self {
        Self::with_pool(Arc::new(CompressorPool::new()))
    }

    pub fn with_pool(pool: Arc<CompressorPool>) -> Self {
        Self { pool }
    }
}

impl Default for Compression {
    fn default() -> Self { Self::new() }
}

impl Plugin for Compression {
    fn call(&self, w: &mut dyn ResponseWriter, req: &Request, next: Next<'_>) {
        w.headers_mut().append(VARY, HeaderValue::from_static("Accept-Encoding"));

        let Some(encoding) = req.header(ACCEPT_ENCODING).and_then(negotiate) else {
            next.run(w, req);
            return;
        };

        let compressor = match self.pool.acquire(encoding) {
            Ok(compressor) => compressor,
            Err(e) => {
                warn!(path = req.path(), "{e}");
                w.set_status(StatusCode::SERVICE_UNAVAILABLE);
                return;
            }
        };

        let mut writer = CompressingWriter::new(w, compressor);
        next.run(&mut writer, req);
        if let Err(e) = writer.finish() {
            error!(%encoding, path = req.path(), "finishing compressed body failed: {e}");
        }
    }
}

// ── CompressingWriter ─────────────────────────────────────────────────────────

/// Response sink that compresses body bytes into the sink it wraps. Status
/// and headers pass straight through.
struct CompressingWriter<'a, 'p> {
    inner: &'a mut dyn ResponseWriter,
    compressor: PooledCompressor<'p>,
    buf: Vec<u8>,
    written: bool,
}

impl<'a, 'p> CompressingWriter<'a, 'p> {
    fn new(inner: &'a mut dyn ResponseWriter, compressor: PooledCompressor<'p>) -> Self {
        let encoding = compressor.encoding();
        inner.headers_mut().insert(CONTENT_ENCODING, HeaderValue::from_static(encoding.as_str()));
        inner.headers_mut().remove(CONTENT_LENGTH);
        Self { inner, compressor, buf: Vec::new(), written: false }
    }

    fn drain(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            self.inner.write_all(&self.buf)?;
            self.buf.clear();
        }
        Ok(())
    }

    /// Flushes the end of the stream. The compressor goes back to the pool
    /// when `self` drops, whether or not this succeeds.
    fn finish(mut self) -> io::Result<()> {
        if !self.written {
            self.inner.headers_mut().remove(CONTENT_ENCODING);
            return Ok(());
        }
        self.compressor.finish(&mut self.buf)?;
        self.drain()?;
        self.inner.flush()
    }
}

impl Write for CompressingWriter<'_, '_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        if !self.written {
            self.written = true;
            if !self.inner.headers().contains_key(CONTENT_TYPE) {
                let sniffed = HeaderValue::from_static(sniff_content_type(data));
                self.inner.headers_mut().insert(CONTENT_TYPE, sniffed);
            }
        }
        self.compressor.write(data, &mut self.buf)?;
        self.drain()?;
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.drain()?;
        self.inner.flush()
    }
}

/// Content type for a body whose handler never set one, judged from the
/// first bytes written. Once compressed, clients can no longer sniff it.
fn sniff_content_type(data: &[u8]) -> &'static str {
    let head = &data[..data.len().min(512)];
    let binary = head.iter().any(|&b| matches!(b, 0x00..=0x08 | 0x0b | 0x0e..=0x1a | 0x1c..=0x1f));
    let text = match std::str::from_utf8(head) {
        Ok(_) => true,
        // A multi-byte character cut off at the window edge.
        Err(e) => e.error_len().is_none(),
    };
    if text && !binary { "text/plain; charset=utf-8" } else { "application/octet-stream" }
}

impl ResponseWriter for CompressingWriter<'_, '_> {
    fn status(&self) -> StatusCode { self.inner.status() }
    fn set_status(&mut self, status: StatusCode) { self.inner.set_status(status) }
    fn headers(&self) -> &HeaderMap { self.inner.headers() }
    fn headers_mut(&mut self) -> &mut HeaderMap { self.inner.headers_mut() }
}
