//! Per-request tracing span.

use std::time::Instant;

use tracing::{info, info_span};

use crate::chain::Next;
use crate::plugin::Plugin;
use crate::request::Request;
use crate::response::ResponseWriter;

/// Opens an `http.request` span around the rest of the chain and logs the
/// final status and latency once it returns.
///
/// Attach it first with [`Router::wrap`](crate::Router::wrap) so that every
/// later plugin, handler and fallback logs inside the span.
#[derive(Clone, Copy, Debug, Default)]
pub struct Trace {
    _priv: (),
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Plugin for Trace {
    fn call(&self, w: &mut dyn ResponseWriter, req: &Request, next: Next<'_>) {
        let span = info_span!("http.request", method = %req.method(), path = req.path());
        let _enter = span.enter();
        let started = Instant::now();

        next.run(w, req);

        info!(
            status = w.status().as_u16(),
            latency_us = started.elapsed().as_micros() as u64,
            "request finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use http::{Method, StatusCode};

    use super::*;
    use crate::handler::handler_fn;
    use crate::response::Response;
    use crate::router::Router;

    #[test]
    fn forwards_and_leaves_the_response_alone() {
        let router = Router::new()
            .wrap(Trace::new())
            .get("/", handler_fn(|w, _| w.set_status(StatusCode::ACCEPTED)));

        let mut res = Response::new();
        router.dispatch(&mut res, &Request::new(Method::GET, "/"));
        assert_eq!(res.status(), StatusCode::ACCEPTED);
    }
}
