//! Request and response transport contract.
use crate::Result;
use async_trait::async_trait;
use http::StatusCode;
use std::{fmt, time::Duration};
use url::Url;

/// Response received from a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// Status code of the response.
    pub status: StatusCode,
    /// Opaque response body.
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Create a response with a success status code.
    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    /// Whether the helper reported it is gone.
    pub fn is_gone(&self) -> bool {
        self.status == StatusCode::GONE
    }
}

/// Transport used to reach a helper.
///
/// Implementations must honour the timeout and report expiry
/// as [crate::Error::Timeout].
#[async_trait]
pub trait Transport: fmt::Debug + Send + Sync {
    /// Send an opaque request body to a helper address.
    async fn send(
        &self,
        address: &Url,
        body: Vec<u8>,
        timeout: Duration,
    ) -> Result<TransportResponse>;
}
