#![deny(missing_docs)]
#![forbid(unsafe_code)]
//! HTTP binding of the helper transport.
//!
//! Requests are protobuf bodies sent with `POST` to the helper
//! endpoint relative to the address of each helper.
use async_trait::async_trait;
use custodia_wire::{
    Error as WireError, Result as WireResult, Transport, TransportResponse,
    HELPER_ENDPOINT, MIME_TYPE_PROTOBUF,
};
use reqwest::header::CONTENT_TYPE;
use std::{fmt, time::Duration};
use tracing::instrument;
use url::Url;

mod error;

pub use error::Error;

/// Result type for the HTTP transport.
pub type Result<T> = std::result::Result<T, Error>;

/// Transport that reaches helpers over HTTP(S).
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a new transport.
    pub fn new() -> Result<Self> {
        let client = reqwest::ClientBuilder::new()
            .connect_timeout(Duration::from_millis(5000))
            .build()?;
        Ok(Self { client })
    }

    /// URL of the helper endpoint for a helper address.
    ///
    /// The address is treated as a base URL so a path prefix
    /// must end with a slash to be preserved.
    pub fn endpoint(address: &Url) -> WireResult<Url> {
        address
            .join(HELPER_ENDPOINT)
            .map_err(|e| WireError::Transport(e.to_string()))
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport").finish()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip_all)]
    async fn send(
        &self,
        address: &Url,
        body: Vec<u8>,
        timeout: Duration,
    ) -> WireResult<TransportResponse> {
        let url = Self::endpoint(address)?;
        tracing::debug!(url = %url, len = %body.len(), "http::send");

        let map_error = |e: reqwest::Error| {
            if e.is_timeout() {
                WireError::Timeout(timeout)
            } else {
                WireError::Transport(e.to_string())
            }
        };

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, MIME_TYPE_PROTOBUF)
            .timeout(timeout)
            .body(body)
            .send()
            .await
            .map_err(map_error)?;

        let status = response.status();
        tracing::debug!(status = %status, "http::send");
        let body = response.bytes().await.map_err(map_error)?;
        Ok(TransportResponse {
            status,
            body: body.to_vec(),
        })
    }
}
