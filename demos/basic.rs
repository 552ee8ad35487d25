//! Minimal plait example: JSON endpoints, per-route auth, compression, and
//! a diagnostic log stream.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl --compressed http://localhost:3000/users/42
//!   curl -X POST http://localhost:3000/users \
//!        -H 'authorization: Bearer demo' \
//!        -d '{"name":"alice"}'
//!   curl -X DELETE http://localhost:3000/users/42

use std::sync::Arc;

use http::{Method, StatusCode};
use plait::middleware::{Compression, CompressorPool, Trace};
use plait::{handler_fn, Logger, Next, Request, ResponseWriter, ResponseWriterExt, Router, Server};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let audit = Arc::new(Logger::new());
    let lines = audit.add_subscriber("stdout");
    std::thread::spawn(move || {
        for line in lines {
            println!("{line}");
        }
    });

    let audit_writes = {
        let audit = Arc::clone(&audit);
        handler_fn(move |_, req| {
            let _ = audit.info(format_args!("{} {}", req.method(), req.path()));
        })
    };

    let app = Router::new()
        .wrap(Trace::new())
        .wrap(Compression::with_pool(Arc::new(
            CompressorPool::with_limit(256).level(flate2::Compression::fast()),
        )))
        .get("/users/{id}",    get_user)
        .post("/users",        create_user)
        .delete("/users/{id}", delete_user)
        .plug(Method::POST, "/users", require_token)
        .plug_handler(Method::POST, "/users", audit_writes);

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

// GET /users/{id}
fn get_user(w: &mut dyn ResponseWriter, req: &Request) {
    let id = req.param("id").unwrap_or("unknown");
    w.json(format!(r#"{{"id":"{id}","name":"alice"}}"#).as_bytes());
}

// POST /users
//
// req.body() is the buffered body; parse with serde_json::from_slice, etc.
fn create_user(w: &mut dyn ResponseWriter, req: &Request) {
    if req.body().is_empty() {
        return w.status_only(StatusCode::BAD_REQUEST);
    }
    w.set_status(StatusCode::CREATED);
    w.headers_mut().insert(http::header::LOCATION, http::HeaderValue::from_static("/users/99"));
    w.json(br#"{"id":"99","name":"new_user"}"#);
}

// DELETE /users/{id} → 204 No Content
fn delete_user(w: &mut dyn ResponseWriter, _req: &Request) {
    w.status_only(StatusCode::NO_CONTENT);
}

// Rejects POST /users without credentials; the handler never runs.
fn require_token(w: &mut dyn ResponseWriter, req: &Request, next: Next<'_>) {
    match req.header("authorization") {
        Some(_) => next.run(w, req),
        None => {
            w.set_status(StatusCode::UNAUTHORIZED);
            w.text("missing credentials");
        }
    }
}
