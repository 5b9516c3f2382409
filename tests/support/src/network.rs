//! In-process transport routing requests to helper services.
use async_trait::async_trait;
use custodia_helper::{HelperService, PairingPolicy};
use custodia_types::{HelperIdentity, Operation};
use custodia_wire::{
    Error, ProtobufCodec, Result, Transport, TransportResponse, WireCodec,
};
use http::StatusCode;
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc, time::Duration};
use url::Url;

/// Scripted behaviour of a mock helper.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Handle the request with the helper service.
    Respond,
    /// Fail with a transport error.
    Fail(String),
    /// Never answer so the request times out.
    Timeout,
    /// Wait before handling the request.
    Delay(Duration),
    /// Answer with `410 Gone`.
    Gone,
    /// Answer with a status code and an empty body.
    Status(StatusCode),
    /// Answer with an arbitrary body.
    Body(Vec<u8>),
}

struct MockHelper {
    service: Arc<HelperService>,
    behavior: Behavior,
    overrides: HashMap<Operation, Behavior>,
    requests: Vec<Operation>,
}

/// Transport delivering requests to in-process helpers.
#[derive(Default)]
pub struct MockNetwork {
    helpers: RwLock<HashMap<Url, MockHelper>>,
}

impl MockNetwork {
    /// Create an empty network.
    pub fn new() -> Arc<Self> {
        Arc::new(Default::default())
    }

    /// Add a helper answering with a pairing policy.
    pub fn add_helper(
        &self,
        name: &str,
        policy: PairingPolicy,
    ) -> anyhow::Result<HelperIdentity> {
        let address: Url = format!("mock://{}/", name).parse()?;
        let identity = crate::helper_identity(name, address.clone())?;
        self.helpers.write().insert(
            address,
            MockHelper {
                service: Arc::new(HelperService::new(name, policy)),
                behavior: Behavior::Respond,
                overrides: Default::default(),
                requests: Vec::new(),
            },
        );
        Ok(identity)
    }

    /// Add accepting helpers named `helper-1` to `helper-N`.
    pub fn add_helpers(
        &self,
        count: usize,
    ) -> anyhow::Result<Vec<HelperIdentity>> {
        (1..=count)
            .map(|index| {
                self.add_helper(
                    &format!("helper-{}", index),
                    PairingPolicy::Accept,
                )
            })
            .collect()
    }

    /// Set the behaviour of a helper for every operation.
    pub fn set_behavior(&self, identity: &HelperIdentity, behavior: Behavior) {
        if let Some(helper) = self.helpers.write().get_mut(identity.address()) {
            helper.behavior = behavior;
            helper.overrides.clear();
        }
    }

    /// Set the behaviour of a helper for one operation.
    pub fn set_operation_behavior(
        &self,
        identity: &HelperIdentity,
        operation: Operation,
        behavior: Behavior,
    ) {
        if let Some(helper) = self.helpers.write().get_mut(identity.address()) {
            helper.overrides.insert(operation, behavior);
        }
    }

    /// Service behind a helper.
    pub fn service(
        &self,
        identity: &HelperIdentity,
    ) -> Option<Arc<HelperService>> {
        self.helpers
            .read()
            .get(identity.address())
            .map(|helper| Arc::clone(&helper.service))
    }

    /// Operations a helper has received in order.
    pub fn requests(&self, identity: &HelperIdentity) -> Vec<Operation> {
        self.helpers
            .read()
            .get(identity.address())
            .map(|helper| helper.requests.clone())
            .unwrap_or_default()
    }

    /// Number of requests for an operation a helper has received.
    pub fn count(
        &self,
        identity: &HelperIdentity,
        operation: Operation,
    ) -> usize {
        self.requests(identity)
            .into_iter()
            .filter(|op| *op == operation)
            .count()
    }
}

impl std::fmt::Debug for MockNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockNetwork")
            .field("helpers", &self.helpers.read().len())
            .finish()
    }
}

#[async_trait]
impl Transport for MockNetwork {
    async fn send(
        &self,
        address: &Url,
        body: Vec<u8>,
        timeout: Duration,
    ) -> Result<TransportResponse> {
        let operation = ProtobufCodec.decode_request(&body)?.operation();
        let (service, behavior) = {
            let mut helpers = self.helpers.write();
            let helper = helpers.get_mut(address).ok_or_else(|| {
                Error::Transport(format!("unknown helper {}", address))
            })?;
            helper.requests.push(operation);
            let behavior = helper
                .overrides
                .get(&operation)
                .unwrap_or(&helper.behavior)
                .clone();
            (Arc::clone(&helper.service), behavior)
        };

        tracing::debug!(
            address = %address,
            operation = %operation,
            behavior = ?behavior,
            "mock_network::send",
        );

        match behavior {
            Behavior::Respond => Ok(TransportResponse::ok(
                service.handle_bytes(&body).map_err(|e| {
                    Error::Transport(e.to_string())
                })?,
            )),
            Behavior::Fail(reason) => Err(Error::Transport(reason)),
            Behavior::Timeout => {
                tokio::time::sleep(timeout).await;
                Err(Error::Timeout(timeout))
            }
            Behavior::Delay(delay) => {
                tokio::time::sleep(delay).await;
                Ok(TransportResponse::ok(
                    service.handle_bytes(&body).map_err(|e| {
                        Error::Transport(e.to_string())
                    })?,
                ))
            }
            Behavior::Gone => Ok(TransportResponse {
                status: StatusCode::GONE,
                body: Vec::new(),
            }),
            Behavior::Status(status) => Ok(TransportResponse {
                status,
                body: Vec::new(),
            }),
            Behavior::Body(body) => Ok(TransportResponse::ok(body)),
        }
    }
}
