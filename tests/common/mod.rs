//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use node_balancer::error::ProbeError;
use node_balancer::registry::Protocol;
use node_balancer::{Executor, HealthProbe, NodeIdentity};

/// Identity of a node on the loopback interface.
pub fn local_node(port: u16) -> NodeIdentity {
    NodeIdentity::new(Protocol::Http, "127.0.0.1", port)
}

/// Start a programmable mock node on an ephemeral loopback port.
///
/// `f` receives the request target (path and query) and returns status and
/// body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut buf = vec![0u8; 4096];
                        let n = socket.read(&mut buf).await.unwrap_or(0);
                        let head = String::from_utf8_lossy(&buf[..n]);
                        let target = head
                            .lines()
                            .next()
                            .and_then(|line| line.split_whitespace().nth(1))
                            .unwrap_or("/")
                            .to_string();

                        let (status, body) = f(target).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a mock node answering `/ping` with "Ok." and queries with `answer`.
pub async fn start_mock_node(answer: &'static str) -> SocketAddr {
    start_programmable_backend(move |target| async move {
        if target.starts_with("/ping") {
            (200, "Ok.\n".to_string())
        } else if target.starts_with("/?query=") {
            (200, format!("{}\n", answer))
        } else {
            (404, "Not Found".to_string())
        }
    })
    .await
}

/// Probe whose answers are scripted per port. Unscripted nodes are healthy.
#[derive(Default)]
pub struct SwitchProbe {
    failing: Mutex<HashMap<u16, bool>>,
    delays: Mutex<HashMap<u16, Duration>>,
    calls: Mutex<Vec<u16>>,
}

impl SwitchProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, port: u16, failing: bool) {
        self.failing.lock().unwrap().insert(port, failing);
    }

    pub fn set_delay(&self, port: u16, delay: Duration) {
        self.delays.lock().unwrap().insert(port, delay);
    }

    /// Ports probed so far, in completion order.
    pub fn calls(&self) -> Vec<u16> {
        self.calls.lock().unwrap().clone()
    }
}

/// Newtype so the probe can be shared with the test body.
#[derive(Clone)]
pub struct SharedProbe(pub Arc<SwitchProbe>);

impl HealthProbe for SharedProbe {
    async fn probe(&self, node: &NodeIdentity) -> Result<(), ProbeError> {
        let delay = self.0.delays.lock().unwrap().get(&node.port()).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.0.calls.lock().unwrap().push(node.port());

        let failing = self.0.failing.lock().unwrap().get(&node.port()).copied().unwrap_or(false);
        if failing {
            Err(ProbeError::Failed("scripted failure".into()))
        } else {
            Ok(())
        }
    }
}

/// Executor recording every node it is asked to contact.
#[derive(Default)]
pub struct RecordingExecutor {
    contacted: Mutex<Vec<NodeIdentity>>,
    failing: Mutex<HashMap<u16, bool>>,
}

impl RecordingExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, port: u16, failing: bool) {
        self.failing.lock().unwrap().insert(port, failing);
    }

    pub fn contacted(&self) -> Vec<NodeIdentity> {
        self.contacted.lock().unwrap().clone()
    }
}

impl Executor<u64> for RecordingExecutor {
    type Output = (u64, NodeIdentity);
    type Error = std::io::Error;

    async fn execute(&self, node: &NodeIdentity, request: u64) -> Result<(u64, NodeIdentity), std::io::Error> {
        self.contacted.lock().unwrap().push(node.clone());
        tokio::task::yield_now().await;

        let failing = self.failing.lock().unwrap().get(&node.port()).copied().unwrap_or(false);
        if failing {
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "scripted failure"))
        } else {
            Ok((request, node.clone()))
        }
    }
}
