//! Incoming HTTP request type.

use std::collections::HashMap;
use std::sync::OnceLock;

use bytes::Bytes;
use http::header::{AsHeaderName, HeaderMap, HeaderName, HeaderValue};
use http::Method;

/// An incoming HTTP request.
///
/// The body is fully buffered before dispatch begins. Path parameters are
/// filled in by the [`Router`](crate::Router) that resolves the request path.
/// When routers are nested, each one hands its downstream steps the
/// parameters of its own route.
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
    params: OnceLock<HashMap<String, String>>,
}

impl Request {
    /// Creates a request with no headers and an empty body.
    ///
    /// A `?query` suffix on `target` is split off into [`Request::query`].
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path.to_owned(), Some(query.to_owned())),
            None => (target.to_owned(), None),
        };
        Self {
            method,
            path,
            query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            params: OnceLock::new(),
        }
    }

    pub(crate) fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        Self {
            method: parts.method,
            path: parts.uri.path().to_owned(),
            query: parts.uri.query().map(str::to_owned),
            headers: parts.headers,
            body,
            params: OnceLock::new(),
        }
    }

    /// Appends a header. Returns `self` for chaining.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn query(&self) -> Option<&str> { self.query.as_deref() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &Bytes { &self.body }

    /// Case-insensitive header lookup. Values that are not visible ASCII
    /// are treated as absent.
    pub fn header(&self, name: impl AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get()?.get(key).map(String::as_str)
    }

    /// Records the parameters captured by path resolution. Fails, handing
    /// the map back, if an enclosing router already resolved this request.
    pub(crate) fn set_params(&self, params: HashMap<String, String>) -> Result<(), HashMap<String, String>> {
        self.params.set(params)
    }

    /// A copy of this request carrying `params` instead of the current ones.
    /// Header map and body are shared or cloned, never re-read.
    pub(crate) fn rescoped(&self, params: HashMap<String, String>) -> Self {
        Self {
            method: self.method.clone(),
            path: self.path.clone(),
            query: self.query.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
            params: OnceLock::from(params),
        }
    }
}
