use crate::CancelReason;
use http::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Errors generated by the wire protocol.
#[derive(Debug, Error)]
pub enum Error {
    /// Error generated when a request cannot be decoded
    /// into exactly one operation.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// Error generated when a response is not well formed
    /// or does not answer the expected operation.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Error generated when a request did not complete in time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Error generated when a transport fails to deliver
    /// a request.
    #[error("transport: {0}")]
    Transport(String),

    /// Error generated when a helper replies with an
    /// unexpected HTTP status code.
    #[error("unexpected response status code {0}")]
    ResponseCode(StatusCode),

    /// Error generated when the retry backoff overflows.
    #[error("network retry overflow")]
    RetryOverflow,

    /// Error generated when a retry is canceled.
    #[error("retry was canceled ({0:?})")]
    RetryCanceled(CancelReason),

    /// Error generated when a key has the wrong length.
    #[error("invalid key length {0}, expected {1}")]
    InvalidKeyLength(usize, usize),

    /// Error generated when a sealed payload is too short
    /// to contain the envelope.
    #[error("sealed payload is truncated")]
    SealTruncated,

    /// Error generated when a sealed payload cannot be opened.
    #[error("failed to open sealed payload")]
    SealOpen,

    /// Error generated when a payload cannot be sealed.
    #[error("failed to seal payload")]
    Seal,

    /// Errors generated by the core types.
    #[error(transparent)]
    Types(#[from] custodia_types::Error),

    /// Error generated encoding protobuf messages.
    #[error(transparent)]
    Encode(#[from] prost::EncodeError),

    /// Error generated decoding protobuf messages.
    #[error(transparent)]
    Decode(#[from] prost::DecodeError),
}
