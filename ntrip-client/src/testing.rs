//! Minimal scripted HTTP/1.1 caster for tests.
//!
//! Each accepted connection consumes the next scripted reply. Request
//! heads are recorded so tests can inspect headers.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// One scripted reply.
#[derive(Debug, Clone)]
pub(crate) enum Scripted {
    /// Status with a small text body
    Status { status: u16, reason: &'static str },
    /// 200 followed by body parts, then close (`hold == false`) or keep the
    /// socket open until the client disconnects
    Body { parts: Vec<Vec<u8>>, hold: bool },
    /// Accept the request but never answer; hold until the client leaves
    Silent,
}

impl Scripted {
    pub(crate) fn status(status: u16, reason: &'static str) -> Self {
        Scripted::Status { status, reason }
    }

    pub(crate) fn data(parts: Vec<&str>) -> Self {
        Scripted::Body {
            parts: parts.into_iter().map(|p| p.as_bytes().to_vec()).collect(),
            hold: false,
        }
    }

    pub(crate) fn silent() -> Self {
        Scripted::Silent
    }

    pub(crate) fn held(parts: Vec<&str>) -> Self {
        Scripted::Body {
            parts: parts.into_iter().map(|p| p.as_bytes().to_vec()).collect(),
            hold: true,
        }
    }
}

pub(crate) struct TestServer {
    addr: SocketAddr,
    requests: mpsc::UnboundedReceiver<String>,
    disconnects: mpsc::UnboundedReceiver<()>,
}

impl TestServer {
    pub(crate) async fn spawn(replies: Vec<Scripted>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let replies = Arc::new(Mutex::new(VecDeque::from(replies)));
        let (request_tx, requests) = mpsc::unbounded_channel();
        let (disconnect_tx, disconnects) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let reply = replies.lock().unwrap().pop_front();
                let request_tx = request_tx.clone();
                let disconnect_tx = disconnect_tx.clone();
                tokio::spawn(async move {
                    let Some(reply) = reply else { return };
                    serve(socket, reply, request_tx, disconnect_tx).await;
                });
            }
        });

        Self {
            addr,
            requests,
            disconnects,
        }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Head of the next request received.
    pub(crate) async fn next_request(&mut self) -> String {
        tokio::time::timeout(Duration::from_secs(5), self.requests.recv())
            .await
            .expect("timed out waiting for request")
            .expect("server stopped")
    }

    /// Wait until a held connection sees the client hang up.
    pub(crate) async fn wait_disconnected(&mut self) {
        tokio::time::timeout(Duration::from_secs(5), self.disconnects.recv())
            .await
            .expect("timed out waiting for disconnect")
            .expect("server stopped");
    }
}

async fn serve(
    mut socket: TcpStream,
    reply: Scripted,
    requests: mpsc::UnboundedSender<String>,
    disconnects: mpsc::UnboundedSender<()>,
) {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    let _ = requests.send(String::from_utf8_lossy(&head).into_owned());

    match reply {
        Scripted::Silent => {
            drain_until_closed(&mut socket, &mut buf).await;
            let _ = disconnects.send(());
            return;
        }
        Scripted::Status { status, reason } => {
            let response = format!(
                "HTTP/1.1 {status} {reason}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{reason}",
                reason.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
        }
        Scripted::Body { parts, hold } => {
            let head = "HTTP/1.1 200 OK\r\nContent-Type: gnss/data\r\nConnection: close\r\n\r\n";
            if socket.write_all(head.as_bytes()).await.is_err() {
                return;
            }
            for part in parts {
                if socket.write_all(&part).await.is_err() {
                    return;
                }
                let _ = socket.flush().await;
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            if hold {
                drain_until_closed(&mut socket, &mut buf).await;
                let _ = disconnects.send(());
                return;
            }
        }
    }
    let _ = socket.shutdown().await;
}

async fn drain_until_closed(socket: &mut TcpStream, buf: &mut [u8]) {
    loop {
        match socket.read(buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
    }
}
