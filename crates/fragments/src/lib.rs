#![deny(missing_docs)]
#![forbid(unsafe_code)]
//! Threshold splitting of secret payloads into fragments.
//!
//! A [FragmentProvider] splits a payload into `count` fragments
//! of which any `threshold` combine back into the payload. The
//! sharing core treats fragments as opaque bytes.

mod error;
mod fragment;
mod shamir;

pub use error::Error;
pub use fragment::Fragment;
pub use shamir::{ShamirProvider, MAX_FRAGMENTS};

use std::fmt;

/// Result type for the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Splits payloads into fragments and combines them back.
pub trait FragmentProvider: fmt::Debug + Send + Sync {
    /// Split a payload into `count` fragments, any `threshold`
    /// of which reconstruct the payload.
    fn split(
        &self,
        payload: &[u8],
        count: usize,
        threshold: usize,
    ) -> Result<Vec<Fragment>>;

    /// Combine at least threshold fragments into the payload.
    fn combine(&self, fragments: &[Fragment]) -> Result<Vec<u8>>;
}
