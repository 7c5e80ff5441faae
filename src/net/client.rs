//! Outbound node client.
//!
//! # Responsibilities
//! - Issue HTTP requests to a node (health `/ping`, `SELECT 1`)
//! - Open plain TCP connections for non-HTTP protocols
//! - Implement the `Executor` collaborator for the demo client
//!
//! # Design Decisions
//! - One shared hyper client; connection reuse is hyper's business
//! - The node to contact is always passed in, never looked up here

use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::{Request, StatusCode};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time;

use crate::load_balancer::balancer::Executor;
use crate::registry::node::{NodeIdentity, Protocol};

/// Errors raised while talking to a node.
#[derive(Debug, Error)]
pub enum NodeClientError {
    #[error("Request build error: {0}")]
    Http(#[from] hyper::http::Error),

    #[error("Client error: {0}")]
    Client(#[from] hyper_util::client::legacy::Error),

    #[error("Body error: {0}")]
    Body(#[from] hyper::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Node returned status {0}")]
    Status(StatusCode),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Protocol {0} is not supported for this operation")]
    Unsupported(Protocol),
}

/// Thin async client for reaching a single node.
#[derive(Clone)]
pub struct NodeClient {
    http: Client<HttpConnector, Empty<Bytes>>,
    request_timeout: Duration,
}

impl NodeClient {
    pub fn new(request_timeout: Duration) -> Self {
        let http = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            http,
            request_timeout,
        }
    }

    /// GET `path_and_query` on `node`, returning status and full body.
    pub async fn http_get(
        &self,
        node: &NodeIdentity,
        path_and_query: &str,
    ) -> Result<(StatusCode, Bytes), NodeClientError> {
        if node.protocol() != Protocol::Http {
            return Err(NodeClientError::Unsupported(node.protocol()));
        }

        let request = Request::builder()
            .method("GET")
            .uri(format!("http://{}{}", node.authority(), path_and_query))
            .header("user-agent", "node-balancer")
            .body(Empty::<Bytes>::new())?;

        let exchange = async {
            let response = self.http.request(request).await?;
            let status = response.status();
            let body = response.into_body().collect().await?.to_bytes();
            Ok::<_, NodeClientError>((status, body))
        };

        match time::timeout(self.request_timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(NodeClientError::Timeout(self.request_timeout)),
        }
    }

    /// Open and immediately drop a TCP connection to `node`.
    pub async fn tcp_connect(&self, node: &NodeIdentity) -> Result<(), NodeClientError> {
        match time::timeout(self.request_timeout, TcpStream::connect(node.authority())).await {
            Ok(stream) => {
                stream?;
                Ok(())
            }
            Err(_) => Err(NodeClientError::Timeout(self.request_timeout)),
        }
    }
}

/// Runs a SQL statement over the HTTP interface and returns the trimmed body.
#[derive(Clone)]
pub struct QueryExecutor {
    client: NodeClient,
}

impl QueryExecutor {
    pub fn new(client: NodeClient) -> Self {
        Self { client }
    }
}

impl Executor<String> for QueryExecutor {
    type Output = String;
    type Error = NodeClientError;

    async fn execute(&self, node: &NodeIdentity, query: String) -> Result<String, NodeClientError> {
        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        let (status, body) = self
            .client
            .http_get(node, &format!("/?query={}", encoded))
            .await?;

        if !status.is_success() {
            return Err(NodeClientError::Status(status));
        }

        String::from_utf8(body.to_vec())
            .map(|text| text.trim().to_string())
            .map_err(|e| NodeClientError::UnexpectedResponse(e.to_string()))
    }
}
