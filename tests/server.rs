use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use http::{Method, StatusCode};
use plait::{handler_fn, plugin_fn, Request, ResponseWriter, ResponseWriterExt, Router, Server};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

struct Running {
    addr: std::net::SocketAddr,
    stop: oneshot::Sender<()>,
    task: tokio::task::JoinHandle<Result<(), plait::Error>>,
}

async fn start(router: Router) -> Running {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(Server::from_listener(listener).serve_with_shutdown(router, async {
        let _ = stopped.await;
    }));
    Running { addr, stop, task }
}

async fn roundtrip(addr: std::net::SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    String::from_utf8_lossy(&out).into_owned()
}

fn echo_id(w: &mut dyn ResponseWriter, req: &Request) {
    w.text(&format!("user {}", req.param("id").unwrap_or("?")));
}

fn echo_body(w: &mut dyn ResponseWriter, req: &Request) {
    w.set_status(StatusCode::CREATED);
    w.text(std::str::from_utf8(req.body()).unwrap_or(""));
}

#[tokio::test(flavor = "multi_thread")]
async fn serves_routes_plugins_and_fallback_over_tcp() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = {
        let hits = Arc::clone(&hits);
        plugin_fn(move |w, req, next| {
            hits.fetch_add(1, Ordering::SeqCst);
            next.run(w, req);
        })
    };
    let router = Router::new()
        .wrap(counter)
        .get("/users/{id}", echo_id)
        .post("/users", echo_body);
    let server = start(router).await;

    let res = roundtrip(server.addr, "GET /users/42 HTTP/1.1\r\nhost: test\r\nconnection: close\r\n\r\n").await;
    assert!(res.starts_with("HTTP/1.1 200 OK"), "{res}");
    assert!(res.ends_with("user 42"), "{res}");

    let res = roundtrip(
        server.addr,
        "POST /users HTTP/1.1\r\nhost: test\r\ncontent-length: 5\r\nconnection: close\r\n\r\nalice",
    )
    .await;
    assert!(res.starts_with("HTTP/1.1 201 Created"), "{res}");
    assert!(res.ends_with("alice"), "{res}");

    let res = roundtrip(server.addr, "DELETE /users/42 HTTP/1.1\r\nhost: test\r\nconnection: close\r\n\r\n").await;
    assert!(res.starts_with("HTTP/1.1 501 Not Implemented"), "{res}");

    let res = roundtrip(server.addr, "GET /nowhere HTTP/1.1\r\nhost: test\r\nconnection: close\r\n\r\n").await;
    assert!(res.starts_with("HTTP/1.1 404 Not Found"), "{res}");

    assert_eq!(hits.load(Ordering::SeqCst), 4);

    server.stop.send(()).unwrap();
    server.task.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn panicking_handler_becomes_500_and_server_keeps_serving() {
    let router = Router::new()
        .on(Method::GET, "/boom", handler_fn(|_, _| panic!("handler fault")))
        .get("/ok", handler_fn(|w, _| w.text("still here")));
    let server = start(router).await;

    let res = roundtrip(server.addr, "GET /boom HTTP/1.1\r\nhost: test\r\nconnection: close\r\n\r\n").await;
    assert!(res.starts_with("HTTP/1.1 500 Internal Server Error"), "{res}");

    let res = roundtrip(server.addr, "GET /ok HTTP/1.1\r\nhost: test\r\nconnection: close\r\n\r\n").await;
    assert!(res.ends_with("still here"), "{res}");

    server.stop.send(()).unwrap();
    server.task.await.unwrap().unwrap();
}
