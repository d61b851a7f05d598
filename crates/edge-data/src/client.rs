//! Network fetch.

use async_trait::async_trait;
use edge_core::{Body, Failure, Request, Response};
use tracing::debug;

use crate::timeout::TimeoutConfig;

/// Performs the network fetch for a request.
///
/// A returned response is any HTTP answer, including 4xx/5xx. Only a
/// rejected fetch (no answer at all) is a [`Failure::Network`].
#[async_trait]
pub trait Network: Send + Sync {
    /// Fetch a request from the network.
    async fn fetch(&self, request: Request) -> Result<Response, Failure>;
}

/// reqwest-backed [`Network`]. Bodies are buffered before returning.
#[derive(Debug, Clone)]
pub struct HttpNetwork {
    client: reqwest::Client,
}

/// Error building the HTTP client.
#[derive(Debug, thiserror::Error)]
#[error("failed to build HTTP client: {0}")]
pub struct ClientBuildError(#[from] reqwest::Error);

impl HttpNetwork {
    /// Create a client with default settings.
    pub fn new() -> Result<Self, ClientBuildError> {
        Self::with_timeouts(&TimeoutConfig::none())
    }

    /// Create a client with explicit timeouts.
    pub fn with_timeouts(timeouts: &TimeoutConfig) -> Result<Self, ClientBuildError> {
        let mut builder = reqwest::Client::builder();
        if let Some(connect) = timeouts.connect {
            builder = builder.connect_timeout(connect);
        }
        if let Some(total) = timeouts.total {
            builder = builder.timeout(total);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Wrap an existing reqwest client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: Request) -> Result<Response, Failure> {
        let url = request.url().to_string();
        let mut outgoing = self
            .client
            .request(request.method().clone(), request.url().clone())
            .headers(request.headers().clone());
        if let Some(body) = request.body() {
            outgoing = outgoing.body(body.clone());
        }

        let incoming = outgoing
            .send()
            .await
            .map_err(|e| Failure::network(&url, e.to_string()))?;
        let status = incoming.status();
        let headers = incoming.headers().clone();
        let bytes = incoming
            .bytes()
            .await
            .map_err(|e| Failure::network(&url, e.to_string()))?;

        debug!(url = %url, status = status.as_u16(), bytes = bytes.len(), "network fetch");
        Ok(Response::from_parts(status, headers, Body::Full(bytes)))
    }
}
