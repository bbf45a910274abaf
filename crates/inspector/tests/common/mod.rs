//! Scripted in-process peers: a WebSocket listener that runs one
//! closure per connection, a one-shot HTTP responder for the bootstrap
//! page, and a combined bootstrap peer that serves both on one port.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::future::Future;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

pub type Peer = WebSocketStream<TcpStream>;

/// Bind an ephemeral port and serve exactly one WebSocket connection
/// with `script`. Await the handle to propagate script panics.
pub async fn ws_peer<F, Fut>(script: F) -> (String, JoinHandle<()>)
where
    F: FnOnce(Peer) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let peer = tokio_tungstenite::accept_async(stream).await.unwrap();
        script(peer).await;
    });
    (format!("ws://{addr}"), handle)
}

/// Serve `body` once as HTTP 200 and close.
pub async fn http_once(body: &str) -> (SocketAddr, JoinHandle<()>) {
    let body = body.to_string();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 4096];
        let _ = stream.read(&mut request).await;
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.unwrap();
    });
    (addr, handle)
}

/// Bootstrap peer: answers HTTP requests with `html` and hands the
/// first `/socket/...` upgrade to `script`.
pub async fn bootstrap_peer<F, Fut>(html: &str, script: F) -> (SocketAddr, JoinHandle<()>)
where
    F: FnOnce(Peer) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let html = html.to_string();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let mut script = Some(script);
        loop {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut head = [0u8; 1024];
            let peeked = stream.peek(&mut head).await.unwrap();
            let head = String::from_utf8_lossy(&head[..peeked]);

            if head.starts_with("GET /socket/") {
                let peer = tokio_tungstenite::accept_async(stream).await.unwrap();
                match script.take() {
                    Some(script) => script(peer).await,
                    None => panic!("unexpected second websocket connection"),
                }
                return;
            }

            let mut drain = vec![0u8; peeked];
            let _ = stream.read_exact(&mut drain).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                html.len(),
                html
            );
            stream.write_all(response.as_bytes()).await.unwrap();
        }
    });
    (addr, handle)
}

/// Next text frame as JSON. Panics if the client hangs up first.
pub async fn recv_json(peer: &mut Peer) -> Value {
    loop {
        match peer.next().await.expect("client closed early").expect("peer read failed") {
            Message::Text(text) => {
                return serde_json::from_str(&text).expect("client sent non-JSON text")
            }
            _ => continue,
        }
    }
}

/// Like `recv_json`, but None once the client hangs up.
pub async fn try_recv_json(peer: &mut Peer) -> Option<Value> {
    loop {
        match peer.next().await? {
            Ok(Message::Text(text)) => return serde_json::from_str(&text).ok(),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
}

pub async fn send_json(peer: &mut Peer, value: Value) {
    peer.send(Message::Text(value.to_string()))
        .await
        .expect("peer write failed");
}

pub async fn send_text(peer: &mut Peer, text: &str) {
    peer.send(Message::Text(text.to_string()))
        .await
        .expect("peer write failed");
}

pub fn target_created(target_id: &str) -> Value {
    json!({
        "method": "Target.targetCreated",
        "params": { "targetInfo": { "targetId": target_id, "type": "page" } }
    })
}

pub fn dispatch_from_target(target_id: &str, inner: Value) -> Value {
    json!({
        "method": "Target.dispatchMessageFromTarget",
        "params": { "targetId": target_id, "message": inner.to_string() }
    })
}

/// Pull (outer id, inner envelope) out of an addressed dispatch frame.
pub fn open_dispatch(frame: &Value) -> (u64, Value) {
    assert_eq!(
        frame["method"], "Target.sendMessageToTarget",
        "expected an addressed dispatch, got {frame}"
    );
    let outer_id = frame["id"].as_u64().expect("outer id");
    let inner = serde_json::from_str(frame["params"]["message"].as_str().expect("message payload"))
        .expect("inner envelope is JSON");
    (outer_id, inner)
}

/// Serve one evaluate exchange: read the dispatch, acknowledge it, and
/// deliver `value` as the inner evaluation result. Returns the
/// evaluated expression so callers can inspect it.
pub async fn serve_evaluate(peer: &mut Peer, target_id: &str, value: Value) -> String {
    let frame = recv_json(peer).await;
    let (outer_id, inner) = open_dispatch(&frame);
    let expression = inner["params"]["expression"]
        .as_str()
        .expect("expression")
        .to_string();
    let inner_id = inner["id"].as_u64().expect("inner id");
    send_json(peer, json!({ "id": outer_id, "result": {} })).await;
    send_json(
        peer,
        dispatch_from_target(
            target_id,
            json!({ "id": inner_id, "result": { "result": { "value": value } } }),
        ),
    )
    .await;
    expression
}

/// Token stamped into a bridge wrapper expression.
pub fn wrapper_token(expression: &str) -> u64 {
    let marker = "token: ";
    let start = expression.find(marker).expect("token marker") + marker.len();
    let digits: String = expression[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().expect("token digits")
}
