use super::{
    wire::{
        WirePairRequest, WirePairResponse, WireRetrieveRequest,
        WireRetrieveResponse, WireStoreRequest, WireStoreResponse,
        WireUnpairRequest, WireUnpairResponse, WireVerifyRequest,
        WireVerifyResponse,
    },
    ResultEnvelope,
};
use crate::{Error, Result};
use custodia_types::SecretId;

/// Request to pair a secret with a helper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairRequest {
    /// Secret identifier.
    pub secret_id: SecretId,
    /// Name of the sharer.
    pub sharer: String,
    /// Public key the helper seals its acceptance to.
    pub sharer_key: Vec<u8>,
    /// Description of the secret.
    pub description: String,
}

impl TryFrom<WirePairRequest> for PairRequest {
    type Error = Error;

    fn try_from(value: WirePairRequest) -> Result<Self> {
        Ok(Self {
            secret_id: value.secret_id.as_slice().try_into()?,
            sharer: value.sharer,
            sharer_key: value.sharer_key,
            description: value.description,
        })
    }
}

impl From<PairRequest> for WirePairRequest {
    fn from(value: PairRequest) -> Self {
        Self {
            secret_id: value.secret_id.into(),
            sharer: value.sharer,
            sharer_key: value.sharer_key,
            description: value.description,
        }
    }
}

/// Response to a pair request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairResponse {
    /// Result envelope.
    pub result: ResultEnvelope,
    /// Acceptance token sealed to the sharer key.
    pub sealed_acceptance: Vec<u8>,
}

impl TryFrom<WirePairResponse> for PairResponse {
    type Error = Error;

    fn try_from(value: WirePairResponse) -> Result<Self> {
        Ok(Self {
            result: value.result.try_into()?,
            sealed_acceptance: value.sealed_acceptance,
        })
    }
}

impl From<PairResponse> for WirePairResponse {
    fn from(value: PairResponse) -> Self {
        Self {
            result: Some(value.result.into()),
            sealed_acceptance: value.sealed_acceptance,
        }
    }
}

/// Request to tear down a pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpairRequest {
    /// Secret identifier.
    pub secret_id: SecretId,
    /// Public key of the sharer.
    pub sharer_key: Vec<u8>,
}

impl TryFrom<WireUnpairRequest> for UnpairRequest {
    type Error = Error;

    fn try_from(value: WireUnpairRequest) -> Result<Self> {
        Ok(Self {
            secret_id: value.secret_id.as_slice().try_into()?,
            sharer_key: value.sharer_key,
        })
    }
}

impl From<UnpairRequest> for WireUnpairRequest {
    fn from(value: UnpairRequest) -> Self {
        Self {
            secret_id: value.secret_id.into(),
            sharer_key: value.sharer_key,
        }
    }
}

/// Response to an unpair request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpairResponse {
    /// Result envelope.
    pub result: ResultEnvelope,
}

impl TryFrom<WireUnpairResponse> for UnpairResponse {
    type Error = Error;

    fn try_from(value: WireUnpairResponse) -> Result<Self> {
        Ok(Self {
            result: value.result.try_into()?,
        })
    }
}

impl From<UnpairResponse> for WireUnpairResponse {
    fn from(value: UnpairResponse) -> Self {
        Self {
            result: Some(value.result.into()),
        }
    }
}

/// Request to store the fragment of a version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRequest {
    /// Secret identifier.
    pub secret_id: SecretId,
    /// Public key of the sharer.
    pub sharer_key: Vec<u8>,
    /// Version number.
    pub version: u64,
    /// Opaque fragment bytes.
    pub fragment: Vec<u8>,
}

impl TryFrom<WireStoreRequest> for StoreRequest {
    type Error = Error;

    fn try_from(value: WireStoreRequest) -> Result<Self> {
        Ok(Self {
            secret_id: value.secret_id.as_slice().try_into()?,
            sharer_key: value.sharer_key,
            version: value.version,
            fragment: value.fragment,
        })
    }
}

impl From<StoreRequest> for WireStoreRequest {
    fn from(value: StoreRequest) -> Self {
        Self {
            secret_id: value.secret_id.into(),
            sharer_key: value.sharer_key,
            version: value.version,
            fragment: value.fragment,
        }
    }
}

/// Response to a store request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreResponse {
    /// Result envelope.
    pub result: ResultEnvelope,
    /// Version that was stored.
    pub version: u64,
}

impl TryFrom<WireStoreResponse> for StoreResponse {
    type Error = Error;

    fn try_from(value: WireStoreResponse) -> Result<Self> {
        Ok(Self {
            result: value.result.try_into()?,
            version: value.version,
        })
    }
}

impl From<StoreResponse> for WireStoreResponse {
    fn from(value: StoreResponse) -> Self {
        Self {
            result: Some(value.result.into()),
            version: value.version,
        }
    }
}

/// Request to verify a helper still holds a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyRequest {
    /// Secret identifier.
    pub secret_id: SecretId,
    /// Public key of the sharer.
    pub sharer_key: Vec<u8>,
    /// Version number.
    pub version: u64,
    /// Nonce the helper must echo back.
    pub nonce: Vec<u8>,
}

impl TryFrom<WireVerifyRequest> for VerifyRequest {
    type Error = Error;

    fn try_from(value: WireVerifyRequest) -> Result<Self> {
        Ok(Self {
            secret_id: value.secret_id.as_slice().try_into()?,
            sharer_key: value.sharer_key,
            version: value.version,
            nonce: value.nonce,
        })
    }
}

impl From<VerifyRequest> for WireVerifyRequest {
    fn from(value: VerifyRequest) -> Self {
        Self {
            secret_id: value.secret_id.into(),
            sharer_key: value.sharer_key,
            version: value.version,
            nonce: value.nonce,
        }
    }
}

/// Response to a verify request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyResponse {
    /// Result envelope.
    pub result: ResultEnvelope,
    /// Version that was verified.
    pub version: u64,
    /// Echoed nonce.
    pub nonce: Vec<u8>,
}

impl TryFrom<WireVerifyResponse> for VerifyResponse {
    type Error = Error;

    fn try_from(value: WireVerifyResponse) -> Result<Self> {
        Ok(Self {
            result: value.result.try_into()?,
            version: value.version,
            nonce: value.nonce,
        })
    }
}

impl From<VerifyResponse> for WireVerifyResponse {
    fn from(value: VerifyResponse) -> Self {
        Self {
            result: Some(value.result.into()),
            version: value.version,
            nonce: value.nonce,
        }
    }
}

/// Request to retrieve the fragment of a version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrieveRequest {
    /// Secret identifier.
    pub secret_id: SecretId,
    /// Public key of the sharer.
    pub sharer_key: Vec<u8>,
    /// Version number.
    pub version: u64,
}

impl TryFrom<WireRetrieveRequest> for RetrieveRequest {
    type Error = Error;

    fn try_from(value: WireRetrieveRequest) -> Result<Self> {
        Ok(Self {
            secret_id: value.secret_id.as_slice().try_into()?,
            sharer_key: value.sharer_key,
            version: value.version,
        })
    }
}

impl From<RetrieveRequest> for WireRetrieveRequest {
    fn from(value: RetrieveRequest) -> Self {
        Self {
            secret_id: value.secret_id.into(),
            sharer_key: value.sharer_key,
            version: value.version,
        }
    }
}

/// Response to a retrieve request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrieveResponse {
    /// Result envelope.
    pub result: ResultEnvelope,
    /// Version of the fragment.
    pub version: u64,
    /// Opaque fragment bytes.
    pub fragment: Vec<u8>,
}

impl TryFrom<WireRetrieveResponse> for RetrieveResponse {
    type Error = Error;

    fn try_from(value: WireRetrieveResponse) -> Result<Self> {
        Ok(Self {
            result: value.result.try_into()?,
            version: value.version,
            fragment: value.fragment,
        })
    }
}

impl From<RetrieveResponse> for WireRetrieveResponse {
    fn from(value: RetrieveResponse) -> Self {
        Self {
            result: Some(value.result.into()),
            version: value.version,
            fragment: value.fragment,
        }
    }
}
