//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use flv_pseudostream::config::{LocationConfig, ProxyConfig, ServerConfig};
use flv_pseudostream::flv::FilterMode;
use flv_pseudostream::{HttpServer, Shutdown};

/// Deterministic body of `len` bytes that does not repeat every 256.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// A mock upstream that serves one fixed body and counts requests.
pub struct MockUpstream {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl MockUpstream {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Start a mock upstream answering every request with `body`.
pub async fn start_mock_upstream(body: Vec<u8>) -> MockUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let body = Arc::new(body);

    let counter = hits.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let counter = counter.clone();
            let body = body.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                counter.fetch_add(1, Ordering::SeqCst);

                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: video/x-flv\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = socket.write_all(head.as_bytes()).await;
                if !request.starts_with(b"HEAD") {
                    let _ = socket.write_all(&body).await;
                }
                let _ = socket.shutdown().await;
            });
        }
    });

    MockUpstream { addr, hits }
}

/// Create a fresh directory holding `files`.
pub fn media_dir(files: &[(&str, &[u8])]) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("flv-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    for (name, data) in files {
        std::fs::write(dir.join(name), data).unwrap();
    }
    dir
}

fn location(prefix: &str, mode: FilterMode) -> LocationConfig {
    let mut location = LocationConfig::new(prefix);
    location.flv_filter = Some(mode);
    location
}

/// One default server serving `root` under `/`.
pub fn static_config(root: &Path, mode: FilterMode) -> ProxyConfig {
    let mut loc = location("/", mode);
    loc.root = Some(root.to_string_lossy().into_owned());
    single_server(vec![loc])
}

/// One default server proxying `/` to `upstream`.
pub fn upstream_config(upstream: SocketAddr, mode: FilterMode, cache: bool) -> ProxyConfig {
    let mut loc = location("/", mode);
    loc.upstream = Some(upstream.to_string());
    loc.cache = Some(cache);
    single_server(vec![loc])
}

pub fn single_server(locations: Vec<LocationConfig>) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.servers.push(ServerConfig {
        name: "test".into(),
        host: None,
        flv_filter: None,
        locations,
    });
    config
}

/// A running server; shuts down when dropped.
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_server(config: ProxyConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(config);

    tokio::spawn(async move {
        let _ = server.run(listener, None, server_shutdown).await;
    });

    TestServer { addr, shutdown }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
