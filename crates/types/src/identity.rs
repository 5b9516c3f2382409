//! Identity of a remote helper.
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use url::Url;

/// Immutable identity of a remote custodian.
///
/// Equality is structural so an identity can be used as a
/// map key; two identities that differ only by contact are
/// different helpers.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelperIdentity {
    name: String,
    contact: Url,
    address: Url,
    #[serde(with = "hex::serde")]
    public_key: Vec<u8>,
}

impl HelperIdentity {
    /// Create a new helper identity.
    pub fn new(
        name: impl Into<String>,
        contact: Url,
        address: Url,
        public_key: Vec<u8>,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::EmptyHelperName);
        }
        Ok(Self {
            name,
            contact,
            address,
            public_key,
        })
    }

    /// Display name of the helper.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Contact URI, for example a `mailto:` address.
    pub fn contact(&self) -> &Url {
        &self.contact
    }

    /// Network address the transport sends requests to.
    pub fn address(&self) -> &Url {
        &self.address
    }

    /// Public key material of the helper.
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// SHA-256 fingerprint of the public key, hex-encoded.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(&self.public_key))
    }
}

impl fmt::Display for HelperIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}
