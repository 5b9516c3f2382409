//! Request handling for a helper.
use crate::{store::HelperStore, Result};
use custodia_wire::{
    acceptance_token, PairRequest, PairResponse, PairingCipher,
    ProtobufCodec, Request, Response, ResultEnvelope, ResultStatus,
    RetrieveRequest, RetrieveResponse, StoreRequest, StoreResponse,
    UnpairRequest, UnpairResponse, VerifyRequest, VerifyResponse,
    WireCodec, X25519Cipher,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

/// Policy applied to pairing requests.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairingPolicy {
    /// Accept every pairing request.
    #[default]
    Accept,
    /// Refuse every pairing request.
    Refuse,
}

/// Helper side of the protocol.
pub struct HelperService {
    name: String,
    policy: RwLock<PairingPolicy>,
    retired: AtomicBool,
    store: HelperStore,
    codec: Arc<dyn WireCodec>,
    cipher: Arc<dyn PairingCipher>,
}

impl HelperService {
    /// Create a helper service.
    pub fn new(name: impl Into<String>, policy: PairingPolicy) -> Self {
        Self {
            name: name.into(),
            policy: RwLock::new(policy),
            retired: AtomicBool::new(false),
            store: Default::default(),
            codec: Arc::new(ProtobufCodec),
            cipher: Arc::new(X25519Cipher::new_random()),
        }
    }

    /// Name of the helper.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pairings and fragments held by the helper.
    pub fn store(&self) -> &HelperStore {
        &self.store
    }

    /// Current pairing policy.
    pub fn policy(&self) -> PairingPolicy {
        *self.policy.read()
    }

    /// Change the pairing policy.
    pub fn set_policy(&self, policy: PairingPolicy) {
        *self.policy.write() = policy;
    }

    /// Stop serving every sharer.
    ///
    /// Requests are answered with `410 Gone` by the server.
    pub fn retire(&self) {
        tracing::info!(helper = %self.name, "helper::retire");
        self.retired.store(true, Ordering::SeqCst);
    }

    /// Whether the helper has retired.
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::SeqCst)
    }

    /// Decode a request, handle it and encode the response.
    pub fn handle_bytes(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let request = self.codec.decode_request(bytes)?;
        let response = self.handle(request);
        Ok(self.codec.encode_response(response)?)
    }

    /// Handle a request.
    pub fn handle(&self, request: Request) -> Response {
        tracing::debug!(
            helper = %self.name,
            operation = %request.operation(),
            secret_id = %request.secret_id(),
            "helper::handle",
        );
        match request {
            Request::Pair(request) => Response::Pair(self.pair(request)),
            Request::Unpair(request) => {
                Response::Unpair(self.unpair(request))
            }
            Request::Store(request) => Response::Store(self.store_fragment(request)),
            Request::Verify(request) => {
                Response::Verify(self.verify(request))
            }
            Request::Retrieve(request) => {
                Response::Retrieve(self.retrieve(request))
            }
        }
    }

    fn pair(&self, request: PairRequest) -> PairResponse {
        if self.policy() == PairingPolicy::Refuse {
            return PairResponse {
                result: ResultEnvelope::new(
                    ResultStatus::Refused,
                    "pairing refused",
                ),
                sealed_acceptance: Vec::new(),
            };
        }

        let token = acceptance_token(&request.secret_id, &self.name);
        let sealed = match self.cipher.seal(&request.sharer_key, &token) {
            Ok(sealed) => sealed,
            Err(e) => {
                tracing::warn!(error = %e, "helper::pair");
                return PairResponse {
                    result: ResultEnvelope::new(
                        ResultStatus::Error,
                        e.to_string(),
                    ),
                    sealed_acceptance: Vec::new(),
                };
            }
        };

        self.store.pair(
            &request.sharer_key,
            &request.secret_id,
            &request.sharer,
            &request.description,
        );
        PairResponse {
            result: ResultEnvelope::ok(),
            sealed_acceptance: sealed,
        }
    }

    fn unpair(&self, request: UnpairRequest) -> UnpairResponse {
        let result = if self
            .store
            .unpair(&request.sharer_key, &request.secret_id)
        {
            ResultEnvelope::ok()
        } else {
            ResultEnvelope::new(ResultStatus::NotFound, "not paired")
        };
        UnpairResponse { result }
    }

    fn store_fragment(&self, request: StoreRequest) -> StoreResponse {
        let result = if self.store.store(
            &request.sharer_key,
            &request.secret_id,
            request.version,
            request.fragment,
        ) {
            ResultEnvelope::ok()
        } else {
            ResultEnvelope::new(ResultStatus::Gone, "not paired")
        };
        StoreResponse {
            result,
            version: request.version,
        }
    }

    fn verify(&self, request: VerifyRequest) -> VerifyResponse {
        let result = match self.store.fragment(
            &request.sharer_key,
            &request.secret_id,
            request.version,
        ) {
            Some(Some(_)) => ResultEnvelope::ok(),
            Some(None) => ResultEnvelope::new(
                ResultStatus::NotFound,
                format!("version {} not held", request.version),
            ),
            None => ResultEnvelope::new(ResultStatus::Gone, "not paired"),
        };
        let nonce = if result.is_ok() {
            request.nonce
        } else {
            Vec::new()
        };
        VerifyResponse {
            result,
            version: request.version,
            nonce,
        }
    }

    fn retrieve(&self, request: RetrieveRequest) -> RetrieveResponse {
        let (result, fragment) = match self.store.fragment(
            &request.sharer_key,
            &request.secret_id,
            request.version,
        ) {
            Some(Some(fragment)) => (ResultEnvelope::ok(), fragment),
            Some(None) => (
                ResultEnvelope::new(
                    ResultStatus::NotFound,
                    format!("version {} not held", request.version),
                ),
                Vec::new(),
            ),
            None => (
                ResultEnvelope::new(ResultStatus::Gone, "not paired"),
                Vec::new(),
            ),
        };
        RetrieveResponse {
            result,
            version: request.version,
            fragment,
        }
    }
}

impl fmt::Debug for HelperService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HelperService")
            .field("name", &self.name)
            .field("policy", &self.policy())
            .field("retired", &self.is_retired())
            .field("pairings", &self.store.len())
            .finish()
    }
}
