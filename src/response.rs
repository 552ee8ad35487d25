//! The response sink handed to plugins and handlers.
//!
//! Handlers do not return a response; they write one. [`ResponseWriter`] is
//! the sink: a status, a header map, and an [`io::Write`] body. The server
//! hands every request a fresh buffered [`Response`], and plugins may hand the
//! downstream part of the chain a decorating writer instead (see
//! [`middleware::compression`](crate::middleware::compression)).

use std::io::{self, Write};

use bytes::Bytes;
use http::header::{AsHeaderName, HeaderMap, HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;
use tracing::warn;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`ResponseWriterExt::bytes`].
pub enum ContentType {
    Csv,          // text/csv
    EventStream,  // text/event-stream  (SSE)
    FormData,     // application/x-www-form-urlencoded
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    MsgPack,      // application/msgpack
    OctetStream,  // application/octet-stream  (binary / file download)
    Pdf,          // application/pdf
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Csv         => "text/csv",
            Self::EventStream => "text/event-stream",
            Self::FormData    => "application/x-www-form-urlencoded",
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::MsgPack     => "application/msgpack",
            Self::OctetStream => "application/octet-stream",
            Self::Pdf         => "application/pdf",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }
}

// ── ResponseWriter ────────────────────────────────────────────────────────────

/// A response sink.
///
/// The body is written through [`io::Write`]. Status and headers may be
/// changed until the owner of the underlying buffer turns it into a wire
/// response, which only happens after the whole chain has returned.
pub trait ResponseWriter: io::Write {
    fn status(&self) -> StatusCode;
    fn set_status(&mut self, status: StatusCode);
    fn headers(&self) -> &HeaderMap;
    fn headers_mut(&mut self) -> &mut HeaderMap;
}

/// Convenience writers available on every [`ResponseWriter`].
///
/// Write failures are logged rather than returned: a handler has nowhere to
/// propagate them to.
pub trait ResponseWriterExt: ResponseWriter {
    /// `text/plain; charset=utf-8` body.
    fn text(&mut self, body: &str) {
        self.bytes(ContentType::Text, body.as_bytes());
    }

    /// `application/json` body. Pass bytes from your serialiser directly.
    fn json(&mut self, body: &[u8]) {
        self.bytes(ContentType::Json, body);
    }

    /// Typed body. Use this for XML, HTML, binary, SSE, etc.
    fn bytes(&mut self, content_type: ContentType, body: &[u8]) {
        self.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type.as_str()));
        if let Err(e) = self.write_all(body) {
            warn!("response write failed: {e}");
        }
    }

    /// Status with no body (e.g. `204 No Content`).
    fn status_only(&mut self, status: StatusCode) {
        self.set_status(status);
    }
}

impl<W: ResponseWriter + ?Sized> ResponseWriterExt for W {}

// ── Response ─────────────────────────────────────────────────────────────────

/// An in-memory response: the sink the server gives every request.
///
/// ```rust
/// use plait::{Response, ResponseWriter, ResponseWriterExt};
/// use http::StatusCode;
///
/// let mut res = Response::new();
/// res.set_status(StatusCode::CREATED);
/// res.json(br#"{"id":42}"#);
/// assert_eq!(res.body(), br#"{"id":42}"#);
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Response {
    /// Empty `200 OK` response.
    pub fn new() -> Self {
        Self { status: StatusCode::OK, headers: HeaderMap::new(), body: Vec::new() }
    }

    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: impl AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Converts into the hyper-facing representation. `content-length` is
    /// derived from the buffered body, so any value a handler set is replaced.
    pub(crate) fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(Bytes::from(self.body)));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res.headers_mut().remove(http::header::CONTENT_LENGTH);
        res
    }
}

impl Default for Response {
    fn default() -> Self { Self::new() }
}

impl io::Write for Response {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}

impl ResponseWriter for Response {
    fn status(&self) -> StatusCode { self.status }
    fn set_status(&mut self, status: StatusCode) { self.status = status; }
    fn headers(&self) -> &HeaderMap { &self.headers }
    fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }
}
