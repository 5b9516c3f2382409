use thiserror::Error;

/// Errors generated by fragment providers.
#[derive(Debug, Error)]
pub enum Error {
    /// Error generated when a threshold cannot be satisfied
    /// by the requested number of fragments.
    #[error("invalid threshold {threshold} for {count} fragments")]
    InvalidThreshold {
        /// Requested threshold.
        threshold: usize,
        /// Requested number of fragments.
        count: usize,
    },

    /// Error generated when more fragments are requested than
    /// the provider supports.
    #[error("cannot split into {0} fragments, maximum is {1}")]
    TooManyFragments(usize, usize),

    /// Error generated when a payload is too large to describe
    /// in a fragment header.
    #[error("payload of {0} bytes is too large")]
    PayloadTooLarge(usize),

    /// Error generated when fewer fragments than the threshold
    /// are supplied to combine.
    #[error("have {have} distinct fragments, need {need}")]
    InsufficientFragments {
        /// Number of distinct fragments supplied.
        have: usize,
        /// Threshold required.
        need: usize,
    },

    /// Error generated when a fragment cannot be parsed or is
    /// inconsistent with the other fragments.
    #[error("invalid fragment: {0}")]
    InvalidFragment(String),

    /// Error generated by the secret sharing library.
    #[error("secret sharing: {0}")]
    Vsss(String),
}
