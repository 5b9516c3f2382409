use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Maximum length of a secret identifier in bytes.
pub const MAX_SECRET_ID_LEN: usize = 16;

/// Secret identifier.
///
/// Opaque bytes between 1 and 16 bytes long, unique
/// within a sharer. String encoding is hex with a 0x prefix.
#[derive(
    Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq, Ord, PartialOrd,
)]
#[serde(try_from = "String", into = "String")]
pub struct SecretId(Vec<u8>);

impl SecretId {
    /// Create a secret identifier from bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(Error::EmptySecretId);
        }
        if bytes.len() > MAX_SECRET_ID_LEN {
            return Err(Error::SecretIdTooLong(
                bytes.len(),
                MAX_SECRET_ID_LEN,
            ));
        }
        Ok(Self(bytes))
    }

    /// Use the UTF-8 bytes of a name as the identifier.
    pub fn from_name(name: &str) -> Result<Self> {
        Self::new(name.as_bytes().to_vec())
    }

    /// Create a random secret identifier of the maximum length.
    pub fn random() -> Self {
        use rand::Rng;
        let mut rng = crate::csprng();
        let bytes: [u8; MAX_SECRET_ID_LEN] = rng.gen();
        Self(bytes.to_vec())
    }

    /// Identifier bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for SecretId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl AsRef<[u8]> for SecretId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for SecretId {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self> {
        Self::new(value.to_vec())
    }
}

impl FromStr for SecretId {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        Self::new(hex::decode(s)?)
    }
}

impl From<SecretId> for String {
    fn from(value: SecretId) -> String {
        value.to_string()
    }
}

impl From<SecretId> for Vec<u8> {
    fn from(value: SecretId) -> Vec<u8> {
        value.0
    }
}

impl TryFrom<String> for SecretId {
    type Error = Error;
    fn try_from(value: String) -> Result<Self> {
        <SecretId as FromStr>::from_str(&value)
    }
}
