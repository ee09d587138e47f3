//! End-to-end over a real socket: raw HTTP/1.1 against a served router.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use products_api::store::{MemoryStore, SharedStore};
use products_api::{Server, app};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct Running {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), products_api::Error>>,
}

async fn start() -> Running {
    start_with(Server::bind("127.0.0.1:0".parse().unwrap()).await.unwrap())
}

fn start_with(server: Server) -> Running {
    let store: SharedStore = Arc::new(MemoryStore::new());
    let addr = server.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();

    let handle = tokio::spawn(server.serve_with_shutdown(app(store), async {
        let _ = stopped.await;
    }));

    Running { addr, stop, handle }
}

/// Sends one request with `connection: close` and returns (status, body).
async fn request(addr: SocketAddr, method: &str, path: &str, body: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let raw = format!(
        "{method} {path} HTTP/1.1\r\nhost: localhost\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len(),
    );
    stream.write_all(raw.as_bytes()).await.unwrap();

    // Read until the server closes; a reset after a rejected body still
    // leaves the response already received.
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    while let Ok(n @ 1..) = stream.read(&mut chunk).await {
        buf.extend_from_slice(&chunk[..n]);
    }
    let text = String::from_utf8(buf).unwrap();

    let status = text
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap();
    let body = text
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.to_owned())
        .unwrap_or_default();
    (status, body)
}

#[tokio::test]
async fn serves_product_lifecycle_over_tcp() {
    let server = start().await;
    let addr = server.addr;

    let (status, body) = request(addr, "GET", "/products", "").await;
    assert_eq!(status, 200);
    assert_eq!(body, "[]");

    let (status, body) = request(
        addr,
        "POST",
        "/products",
        r#"{"name":"iPhone","description":"Good phone","price":10000}"#,
    )
    .await;
    assert_eq!(status, 201);
    let created: Value = serde_json::from_str(&body).unwrap();
    let id = created["_id"].as_str().unwrap().to_owned();

    let (status, body) = request(addr, "GET", &format!("/products/{id}"), "").await;
    assert_eq!(status, 200);
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["_id"], id.as_str());

    let (status, body) = request(addr, "DELETE", &format!("/products/{id}"), "").await;
    assert_eq!(status, 204);
    assert!(body.is_empty());

    let (status, _) = request(addr, "GET", &format!("/products/{id}"), "").await;
    assert_eq!(status, 404);

    server.stop.send(()).unwrap();
    server.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn missing_name_is_rejected_over_tcp() {
    let server = start().await;

    let (status, body) = request(server.addr, "POST", "/products", r#"{"price":1}"#).await;

    assert_eq!(status, 400);
    let err: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(err["error"]["code"], "validation_failed");

    server.stop.send(()).unwrap();
    server.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn oversized_body_is_rejected_with_413() {
    let bound = Server::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let server = start_with(bound.max_body_bytes(64));

    let (status, _) = request(server.addr, "POST", "/products", r#"{"name":"iPhone"}"#).await;
    assert_eq!(status, 201);

    let big = format!(r#"{{"name":"{}"}}"#, "x".repeat(200));
    let (status, body) = request(server.addr, "POST", "/products", &big).await;
    assert_eq!(status, 413);
    let err: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(err["error"]["code"], "payload_too_large");

    let (_, list) = request(server.addr, "GET", "/products", "").await;
    assert_eq!(serde_json::from_str::<Value>(&list).unwrap().as_array().map(Vec::len), Some(1));

    server.stop.send(()).unwrap();
    server.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn shutdown_closes_idle_keep_alive_connections() {
    let server = start().await;

    // No `connection: close`, so the connection stays open after the response.
    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream
        .write_all(b"GET /products HTTP/1.1\r\nhost: localhost\r\n\r\n")
        .await
        .unwrap();
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.ends_with(b"[]") {
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before the response");
        buf.extend_from_slice(&chunk[..n]);
    }
    assert!(buf.starts_with(b"HTTP/1.1 200"));

    server.stop.send(()).unwrap();
    let served = tokio::time::timeout(Duration::from_secs(5), server.handle).await;
    assert!(matches!(served, Ok(Ok(Ok(())))), "server did not stop with an idle client");

    let closed = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut chunk)).await;
    assert!(matches!(closed, Ok(Ok(0)) | Ok(Err(_))));
}

#[tokio::test]
async fn shutdown_stops_accepting() {
    let server = start().await;
    let addr = server.addr;

    server.stop.send(()).unwrap();
    server.handle.await.unwrap().unwrap();

    assert!(TcpStream::connect(addr).await.is_err());
}
