use thiserror::Error;

/// Errors generated by the core types.
#[derive(Debug, Error)]
pub enum Error {
    /// Error generated when a secret identifier is empty.
    #[error("secret identifier must not be empty")]
    EmptySecretId,

    /// Error generated when a secret identifier is too long.
    #[error("secret identifier is {0} bytes, maximum is {1}")]
    SecretIdTooLong(usize, usize),

    /// Error generated when a helper name is empty.
    #[error("helper name must not be empty")]
    EmptyHelperName,

    /// Error generated by the hex encoding library.
    #[error(transparent)]
    Hex(#[from] hex::FromHexError),

    /// Error generated parsing URLs.
    #[error(transparent)]
    UrlParse(#[from] url::ParseError),

    /// Error generated formatting time.
    #[error(transparent)]
    TimeFormat(#[from] time::error::Format),

    /// Error generated parsing time.
    #[error(transparent)]
    TimeParse(#[from] time::error::Parse),
}
