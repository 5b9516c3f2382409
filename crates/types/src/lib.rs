//! Core types for the Custodia secret sharing protocol.
//!
//! Types in this crate are shared by the sharer (which splits
//! a secret and distributes fragments) and the helpers (which
//! hold the fragments) so they carry no behavior beyond
//! validation and formatting.
#![deny(missing_docs)]
#![forbid(unsafe_code)]

mod date_time;
mod delivery;
mod error;
mod identity;
mod secret_id;
mod status;

pub use date_time::UtcDateTime;
pub use delivery::DeliveryResult;
pub use error::Error;
pub use identity::HelperIdentity;
pub use secret_id::{SecretId, MAX_SECRET_ID_LEN};
pub use status::{Operation, PairingStatus};

/// Result type for the library.
pub type Result<T> = std::result::Result<T, Error>;

use rand::{rngs::OsRng, CryptoRng, Rng};

/// Exposes the default cryptographically secure RNG.
pub fn csprng() -> impl CryptoRng + Rng {
    OsRng
}
