//! In-process SOCKS4 proxies for exercising the checker end to end.
//!
//! A fake proxy answers the SOCKS4 CONNECT itself and then plays the echo
//! service too, so no traffic leaves the loopback interface.

#![allow(dead_code)]

use socks4_harvest::Endpoint;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Test URL handed to the checker; the fake proxies never dial it.
pub const TEST_URL: &str = "http://127.0.0.1:9/ip";

#[derive(Debug, Clone)]
pub enum Behavior {
    /// Grant the tunnel and answer the GET with this status and body
    Echo { status: u16, body: String },
    /// Refuse the SOCKS4 request (reply code 0x5B)
    Reject,
    /// Accept the TCP connection and never reply
    Silent,
}

impl Behavior {
    pub fn origin(ip: &str) -> Self {
        Behavior::Echo {
            status: 200,
            body: format!(r#"{{"origin": "{}"}}"#, ip),
        }
    }
}

#[derive(Debug, Default)]
pub struct Stats {
    active: AtomicUsize,
    peak: AtomicUsize,
    connections: AtomicUsize,
}

impl Stats {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

struct ActiveGuard(Arc<Stats>);

impl ActiveGuard {
    fn enter(stats: Arc<Stats>) -> Self {
        stats.connections.fetch_add(1, Ordering::SeqCst);
        let now = stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        stats.peak.fetch_max(now, Ordering::SeqCst);
        Self(stats)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct FakeProxy {
    pub addr: SocketAddr,
    pub stats: Arc<Stats>,
}

impl FakeProxy {
    pub async fn spawn(behavior: Behavior) -> Self {
        Self::spawn_with_delay(behavior, Duration::ZERO).await
    }

    /// `delay` is spent after the SOCKS4 request arrives, before replying
    pub async fn spawn_with_delay(behavior: Behavior, delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let stats = Arc::new(Stats::default());

        let server_stats = Arc::clone(&stats);
        tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    break;
                };
                let guard = ActiveGuard::enter(Arc::clone(&server_stats));
                tokio::spawn(serve(socket, behavior.clone(), delay, guard));
            }
        });

        Self { addr, stats }
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::socks4(self.addr.ip().to_string(), self.addr.port())
    }
}

/// An endpoint on a loopback port nobody listens on
pub async fn refused_endpoint() -> Endpoint {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    Endpoint::socks4("127.0.0.1", port)
}

async fn serve(mut socket: TcpStream, behavior: Behavior, delay: Duration, guard: ActiveGuard) {
    // VN, CD, DSTPORT, DSTIP followed by a NUL-terminated user id
    let mut head = [0u8; 8];
    if socket.read_exact(&mut head).await.is_err() || head[0] != 4 || head[1] != 1 {
        return;
    }
    let mut byte = [0u8; 1];
    loop {
        match socket.read_exact(&mut byte).await {
            Ok(_) if byte[0] == 0 => break,
            Ok(_) => continue,
            Err(_) => return,
        }
    }

    tokio::time::sleep(delay).await;

    match behavior {
        Behavior::Silent => {
            let mut sink = [0u8; 256];
            while let Ok(n) = socket.read(&mut sink).await {
                if n == 0 {
                    break;
                }
            }
        }
        Behavior::Reject => {
            drop(guard);
            let _ = socket.write_all(&[0, 0x5B, 0, 0, 0, 0, 0, 0]).await;
        }
        Behavior::Echo { status, body } => {
            if socket.write_all(&[0, 0x5A, 0, 0, 0, 0, 0, 0]).await.is_err() {
                return;
            }
            if read_request_head(&mut socket).await.is_none() {
                return;
            }
            // Leave before answering so the count never outlives the client's attempt
            drop(guard);
            let phrase = if status == 200 { "OK" } else { "Error" };
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                phrase,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    }
}

async fn read_request_head(socket: &mut TcpStream) -> Option<Vec<u8>> {
    let mut head = Vec::new();
    let mut chunk = [0u8; 512];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        head.extend_from_slice(&chunk[..n]);
    }
    Some(head)
}
