use thiserror::Error;

/// Errors generated by the HTTP transport.
#[derive(Debug, Error)]
pub enum Error {
    /// Errors generated by the HTTP client library.
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
}
