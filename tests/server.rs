use std::net::SocketAddr;

use cob::{Context, Engine, Server};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

fn app() -> Engine {
    let mut engine = Engine::default();
    engine.get("/hello/:name", |c: &mut Context| {
        let name = c.param("name").unwrap_or_default().to_owned();
        c.string(200, format_args!("hello {name}"));
    });
    engine.post("/echo", |c: &mut Context| {
        let name = c.post_form("name").unwrap_or_default();
        c.string(201, name);
    });
    engine
}

async fn start(engine: Engine) -> (SocketAddr, oneshot::Sender<()>, JoinHandle<Result<(), cob::Error>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(Server::serve_listener(listener, engine, async {
        let _ = stopped.await;
    }));
    (addr, stop, server)
}

async fn roundtrip(addr: SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn serves_requests_over_tcp() {
    let (addr, stop, server) = start(app()).await;

    let response = roundtrip(
        addr,
        "GET /hello/cob HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
    assert!(response.to_ascii_lowercase().contains("content-type: text/plain\r\n"));
    assert!(response.ends_with("hello cob"));

    let response = roundtrip(
        addr,
        "POST /echo HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
         Content-Type: application/x-www-form-urlencoded\r\nContent-Length: 10\r\n\r\nname=alice",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 201 Created\r\n"), "{response}");
    assert!(response.ends_with("alice"));

    let response = roundtrip(addr, "GET /nope HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"), "{response}");
    assert!(response.ends_with("404 NOT FOUND: /nope"));

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}

fn boom(_: &mut Context) {
    panic!("boom");
}

#[tokio::test]
async fn panics_without_recovery_become_bare_500() {
    let mut engine = Engine::new();
    engine.get("/boom", boom);
    let (addr, stop, server) = start(engine).await;

    let response = roundtrip(addr, "GET /boom HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"), "{response}");

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn oversized_bodies_get_413() {
    let mut engine = app();
    engine.max_body_size(16);
    let (addr, stop, server) = start(engine).await;

    let response = roundtrip(
        addr,
        "POST /echo HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
         Content-Type: application/x-www-form-urlencoded\r\nContent-Length: 10\r\n\r\nname=alice",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 201 Created\r\n"), "{response}");

    let response = roundtrip(
        addr,
        "POST /echo HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
         Content-Type: application/x-www-form-urlencoded\r\nContent-Length: 32\r\n\r\n\
         name=aaaaaaaaaaaaaaaaaaaaaaaaaaa",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 413 Payload Too Large\r\n"), "{response}");

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[test]
fn bind_rejects_bad_addresses() {
    let err = Server::bind("not an address").err().unwrap();
    assert!(err.to_string().starts_with("invalid socket address `not an address`"));
}
