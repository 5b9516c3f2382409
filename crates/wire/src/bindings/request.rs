use super::{
    wire::{WireRequest, WireResponse},
    PairRequest, PairResponse, ResultEnvelope, RetrieveRequest,
    RetrieveResponse, StoreRequest, StoreResponse, UnpairRequest,
    UnpairResponse, VerifyRequest, VerifyResponse,
};
use crate::{Error, ProtoBinding, Result};
use custodia_types::{Operation, SecretId};

/// Request sent by a sharer to a helper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Pair request.
    Pair(PairRequest),
    /// Unpair request.
    Unpair(UnpairRequest),
    /// Store request.
    Store(StoreRequest),
    /// Verify request.
    Verify(VerifyRequest),
    /// Retrieve request.
    Retrieve(RetrieveRequest),
}

impl Request {
    /// Operation of this request.
    pub fn operation(&self) -> Operation {
        match self {
            Self::Pair(_) => Operation::Pair,
            Self::Unpair(_) => Operation::Unpair,
            Self::Store(_) => Operation::Store,
            Self::Verify(_) => Operation::Verify,
            Self::Retrieve(_) => Operation::Retrieve,
        }
    }

    /// Secret identifier the request refers to.
    pub fn secret_id(&self) -> &SecretId {
        match self {
            Self::Pair(req) => &req.secret_id,
            Self::Unpair(req) => &req.secret_id,
            Self::Store(req) => &req.secret_id,
            Self::Verify(req) => &req.secret_id,
            Self::Retrieve(req) => &req.secret_id,
        }
    }
}

impl ProtoBinding for Request {
    type Inner = WireRequest;
}

impl TryFrom<WireRequest> for Request {
    type Error = Error;

    fn try_from(value: WireRequest) -> Result<Self> {
        let count = [
            value.pair.is_some(),
            value.unpair.is_some(),
            value.store.is_some(),
            value.verify.is_some(),
            value.retrieve.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count();

        if count != 1 {
            return Err(Error::MalformedRequest(format!(
                "expected one operation, got {count}"
            )));
        }

        if let Some(req) = value.pair {
            Ok(Self::Pair(req.try_into()?))
        } else if let Some(req) = value.unpair {
            Ok(Self::Unpair(req.try_into()?))
        } else if let Some(req) = value.store {
            Ok(Self::Store(req.try_into()?))
        } else if let Some(req) = value.verify {
            Ok(Self::Verify(req.try_into()?))
        } else if let Some(req) = value.retrieve {
            Ok(Self::Retrieve(req.try_into()?))
        } else {
            unreachable!("operation count checked")
        }
    }
}

impl From<Request> for WireRequest {
    fn from(value: Request) -> Self {
        let mut wire = WireRequest::default();
        match value {
            Request::Pair(req) => wire.pair = Some(req.into()),
            Request::Unpair(req) => wire.unpair = Some(req.into()),
            Request::Store(req) => wire.store = Some(req.into()),
            Request::Verify(req) => wire.verify = Some(req.into()),
            Request::Retrieve(req) => wire.retrieve = Some(req.into()),
        }
        wire
    }
}

/// Response sent by a helper to a sharer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Pair response.
    Pair(PairResponse),
    /// Unpair response.
    Unpair(UnpairResponse),
    /// Store response.
    Store(StoreResponse),
    /// Verify response.
    Verify(VerifyResponse),
    /// Retrieve response.
    Retrieve(RetrieveResponse),
}

impl Response {
    /// Operation this response answers.
    pub fn operation(&self) -> Operation {
        match self {
            Self::Pair(_) => Operation::Pair,
            Self::Unpair(_) => Operation::Unpair,
            Self::Store(_) => Operation::Store,
            Self::Verify(_) => Operation::Verify,
            Self::Retrieve(_) => Operation::Retrieve,
        }
    }

    /// Result envelope of the response.
    pub fn result(&self) -> &ResultEnvelope {
        match self {
            Self::Pair(res) => &res.result,
            Self::Unpair(res) => &res.result,
            Self::Store(res) => &res.result,
            Self::Verify(res) => &res.result,
            Self::Retrieve(res) => &res.result,
        }
    }

    /// Response for an operation carrying only a result envelope.
    pub fn with_result(operation: Operation, result: ResultEnvelope) -> Self {
        match operation {
            Operation::Pair => Self::Pair(PairResponse {
                result,
                sealed_acceptance: Vec::new(),
            }),
            Operation::Unpair => Self::Unpair(UnpairResponse { result }),
            Operation::Store => {
                Self::Store(StoreResponse { result, version: 0 })
            }
            Operation::Verify => Self::Verify(VerifyResponse {
                result,
                version: 0,
                nonce: Vec::new(),
            }),
            Operation::Retrieve => Self::Retrieve(RetrieveResponse {
                result,
                version: 0,
                fragment: Vec::new(),
            }),
        }
    }
}

impl ProtoBinding for Response {
    type Inner = WireResponse;
}

impl TryFrom<WireResponse> for Response {
    type Error = Error;

    fn try_from(value: WireResponse) -> Result<Self> {
        let count = [
            value.pair.is_some(),
            value.unpair.is_some(),
            value.store.is_some(),
            value.verify.is_some(),
            value.retrieve.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count();

        if count != 1 {
            return Err(Error::MalformedResponse(format!(
                "expected one operation, got {count}"
            )));
        }

        if let Some(res) = value.pair {
            Ok(Self::Pair(res.try_into()?))
        } else if let Some(res) = value.unpair {
            Ok(Self::Unpair(res.try_into()?))
        } else if let Some(res) = value.store {
            Ok(Self::Store(res.try_into()?))
        } else if let Some(res) = value.verify {
            Ok(Self::Verify(res.try_into()?))
        } else if let Some(res) = value.retrieve {
            Ok(Self::Retrieve(res.try_into()?))
        } else {
            unreachable!("operation count checked")
        }
    }
}

impl From<Response> for WireResponse {
    fn from(value: Response) -> Self {
        let mut wire = WireResponse::default();
        match value {
            Response::Pair(res) => wire.pair = Some(res.into()),
            Response::Unpair(res) => wire.unpair = Some(res.into()),
            Response::Store(res) => wire.store = Some(res.into()),
            Response::Verify(res) => wire.verify = Some(res.into()),
            Response::Retrieve(res) => wire.retrieve = Some(res.into()),
        }
        wire
    }
}
