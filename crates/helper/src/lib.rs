#![deny(missing_docs)]
#![forbid(unsafe_code)]
//! Helper side custodian for fragments of shared secrets.
//!
//! A helper accepts or refuses pairing requests from sharers,
//! stores the fragment of each version it is sent and answers
//! verification and retrieval requests. The [HelperServer]
//! exposes a [HelperService] at `POST /api/v1/helper`.

mod config;
mod error;
mod server;
mod service;
mod store;

pub use config::HelperConfig;
pub use error::Error;
pub use server::HelperServer;
pub use service::{HelperService, PairingPolicy};
pub use store::{HelperStore, PairingKey, PairingRecord};

/// Result type for the helper.
pub type Result<T> = std::result::Result<T, Error>;
