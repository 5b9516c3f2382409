//! Link between a secret and one helper.
//!
//! Each link owns the pairing status of the helper and at most
//! one outstanding request per operation; issuing a request for
//! an operation that is already in flight cancels the earlier
//! request and its late reply is discarded.
use crate::{
    context::SecretContext,
    notification::{Notification, NotificationKind, Severity},
    policy::{ResponseOutcome, ResponsePolicy},
    share::{CancelChannel, Share},
    Error, Result,
};
use custodia_fragments::Fragment;
use custodia_types::{
    csprng, DeliveryResult, HelperIdentity, Operation, PairingStatus,
};
use custodia_wire::{
    acceptance_token, CancelReason, PairRequest, Request, Response,
    RetrieveRequest, StoreRequest, UnpairRequest, VerifyRequest,
};
use parking_lot::Mutex;
use rand::RngCore;
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc,
};
use tokio::sync::{oneshot, watch};
use tracing::instrument;

const NONCE_LEN: usize = 16;

/// Pending handle for a pairing or removal of a helper.
#[derive(Debug, Clone)]
pub struct HelperHandle {
    identity: HelperIdentity,
    status: watch::Receiver<PairingStatus>,
}

impl HelperHandle {
    /// Helper this handle tracks.
    pub fn identity(&self) -> &HelperIdentity {
        &self.identity
    }

    /// Current pairing status.
    pub fn status(&self) -> PairingStatus {
        *self.status.borrow()
    }

    /// Wait until no request is outstanding for the helper.
    pub async fn resolved(mut self) -> PairingStatus {
        let result = self
            .status
            .wait_for(|status| !status.is_pending())
            .await
            .map(|status| *status);
        result.unwrap_or_else(|_| *self.status.borrow())
    }
}

/// Result of verifying one fragment.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VerifyEntry {
    /// Helper that was asked.
    pub helper: HelperIdentity,
    /// Version that was verified.
    pub version: u64,
    /// Whether the helper proved it holds the fragment.
    pub healthy: bool,
    /// Reason for an unhealthy result.
    pub message: String,
}

/// Reply to one request.
enum Reply {
    Response(Response),
    Gone(String),
    Failed(custodia_wire::Error),
    Canceled(CancelReason),
}

struct Inflight {
    generation: u64,
    cancel: CancelChannel,
}

#[derive(Default)]
struct ClientState {
    status: PairingStatus,
    shares: BTreeMap<u64, Arc<Share>>,
    inflight: HashMap<Operation, Inflight>,
    generation: u64,
    last_result: Option<DeliveryResult>,
}

/// Client for one helper of a secret.
pub struct HelperClient {
    identity: HelperIdentity,
    context: Arc<SecretContext>,
    state: Mutex<ClientState>,
    status: watch::Sender<PairingStatus>,
}

impl HelperClient {
    pub(crate) fn new(
        identity: HelperIdentity,
        context: Arc<SecretContext>,
    ) -> Arc<Self> {
        let (status, _) = watch::channel(PairingStatus::None);
        Arc::new(Self {
            identity,
            context,
            state: Mutex::new(Default::default()),
            status,
        })
    }

    /// Identity of the helper.
    pub fn identity(&self) -> &HelperIdentity {
        &self.identity
    }

    /// Current pairing status.
    pub fn status(&self) -> PairingStatus {
        self.state.lock().status
    }

    /// Fragments sent to this helper keyed by version.
    pub fn shares(&self) -> Vec<Arc<Share>> {
        self.state.lock().shares.values().cloned().collect()
    }

    /// Fragment sent for a version.
    pub fn share(&self, version: u64) -> Option<Arc<Share>> {
        self.state.lock().shares.get(&version).cloned()
    }

    /// Result of the last completed request.
    pub fn last_result(&self) -> Option<DeliveryResult> {
        self.state.lock().last_result.clone()
    }

    /// Handle tracking the pairing status.
    pub fn handle(&self) -> HelperHandle {
        HelperHandle {
            identity: self.identity.clone(),
            status: self.status.subscribe(),
        }
    }

    /// Start pairing with the helper.
    ///
    /// Only valid when the status is `None` or `Failed`.
    pub fn pair(self: &Arc<Self>) -> Result<HelperHandle> {
        let (generation, cancel) = {
            let mut state = self.state.lock();
            if !state.status.can_pair() {
                return Err(self.invalid(Operation::Pair, state.status));
            }
            self.set_status(&mut state, PairingStatus::Invited);
            self.begin(&mut state, Operation::Pair)
        };
        let handle = self.handle();

        tracing::debug!(
            secret_id = %self.context.id,
            helper = %self.identity.name(),
            "helper_client::pair",
        );

        let request = Request::Pair(PairRequest {
            secret_id: self.context.id.clone(),
            sharer: self.context.sharer.clone(),
            sharer_key: self.context.sharer_key(),
            description: self.context.description.clone(),
        });
        let client = Arc::clone(self);
        tokio::spawn(async move {
            let reply = client
                .exchange(Operation::Pair, request, cancel, None)
                .await;
            client.on_pair(generation, reply);
        });
        Ok(handle)
    }

    /// Start removing the pairing, retrying with backoff.
    ///
    /// Only valid when the status is `Paired`.
    pub fn unpair(self: &Arc<Self>) -> Result<HelperHandle> {
        let (generation, cancel) = {
            let mut state = self.state.lock();
            if !state.status.is_paired() {
                return Err(self.invalid(Operation::Unpair, state.status));
            }
            self.set_status(&mut state, PairingStatus::PendingRemoval);
            self.begin(&mut state, Operation::Unpair)
        };
        let handle = self.handle();

        tracing::debug!(
            secret_id = %self.context.id,
            helper = %self.identity.name(),
            "helper_client::unpair",
        );

        let client = Arc::clone(self);
        tokio::spawn(async move {
            client.run_unpair(generation, cancel).await;
        });
        Ok(handle)
    }

    /// Send the fragment of a version.
    ///
    /// Only valid when the status is `Paired`.
    pub fn send(self: &Arc<Self>, share: Arc<Share>) -> Result<()> {
        let (generation, cancel) = {
            let mut state = self.state.lock();
            if !state.status.is_paired() {
                return Err(self.invalid(Operation::Store, state.status));
            }
            state
                .shares
                .insert(share.version_number(), Arc::clone(&share));
            self.begin(&mut state, Operation::Store)
        };

        if let Some(version) = share.version() {
            version.mark_sent();
        }

        tracing::debug!(
            secret_id = %self.context.id,
            helper = %self.identity.name(),
            version = %share.version_number(),
            "helper_client::send",
        );

        let request = Request::Store(StoreRequest {
            secret_id: self.context.id.clone(),
            sharer_key: self.context.sharer_key(),
            version: share.version_number(),
            fragment: share.fragment().as_bytes().to_vec(),
        });
        let client = Arc::clone(self);
        tokio::spawn(async move {
            let reply = client
                .exchange(
                    Operation::Store,
                    request,
                    cancel,
                    Some(share.cancel_receiver()),
                )
                .await;
            client.on_store(generation, &share, reply);
        });
        Ok(())
    }

    /// Ask the helper to prove it still holds a fragment.
    ///
    /// The receiver is closed without an entry when the
    /// verification is superseded or canceled.
    ///
    /// Only valid when the status is `Paired`.
    pub fn verify(
        self: &Arc<Self>,
        share: Arc<Share>,
    ) -> Result<oneshot::Receiver<VerifyEntry>> {
        let (generation, cancel) = {
            let mut state = self.state.lock();
            if !state.status.is_paired() {
                return Err(self.invalid(Operation::Verify, state.status));
            }
            self.begin(&mut state, Operation::Verify)
        };

        let mut nonce = vec![0u8; NONCE_LEN];
        csprng().fill_bytes(&mut nonce);

        tracing::debug!(
            secret_id = %self.context.id,
            helper = %self.identity.name(),
            version = %share.version_number(),
            "helper_client::verify",
        );

        let request = Request::Verify(VerifyRequest {
            secret_id: self.context.id.clone(),
            sharer_key: self.context.sharer_key(),
            version: share.version_number(),
            nonce: nonce.clone(),
        });
        let (tx, rx) = oneshot::channel();
        let client = Arc::clone(self);
        tokio::spawn(async move {
            let reply = client
                .exchange(Operation::Verify, request, cancel, None)
                .await;
            if let Some(entry) =
                client.on_verify(generation, &share, &nonce, reply)
            {
                let _ = tx.send(entry);
            }
        });
        Ok(rx)
    }

    /// Retrieve the fragment of a version.
    ///
    /// Only valid when the status is `Paired`.
    pub async fn retrieve(&self, version: u64) -> Result<Fragment> {
        let (generation, cancel) = {
            let mut state = self.state.lock();
            if !state.status.is_paired() {
                return Err(self.invalid(Operation::Retrieve, state.status));
            }
            self.begin(&mut state, Operation::Retrieve)
        };

        let request = Request::Retrieve(RetrieveRequest {
            secret_id: self.context.id.clone(),
            sharer_key: self.context.sharer_key(),
            version,
        });
        let reply = self
            .exchange(Operation::Retrieve, request, cancel, None)
            .await;

        let mut state = self.state.lock();
        self.finish(&mut state, Operation::Retrieve, generation);
        match reply {
            Reply::Response(Response::Retrieve(res)) => {
                let memo = res.result.memo.clone();
                match ResponsePolicy::outcome(
                    Operation::Retrieve,
                    res.result.status,
                ) {
                    ResponseOutcome::Accept if res.version == version => {
                        self.record(
                            &mut state,
                            DeliveryResult::success(
                                Operation::Retrieve,
                                "retrieved",
                            ),
                        );
                        Ok(Fragment::from(res.fragment))
                    }
                    ResponseOutcome::Accept => {
                        Err(Error::HelperRefused(format!(
                            "returned version {}, expected {}",
                            res.version, version
                        )))
                    }
                    ResponseOutcome::Disconnect => {
                        self.disconnect(&mut state, &memo);
                        Err(Error::HelperRefused(memo))
                    }
                    _ => {
                        self.record(
                            &mut state,
                            DeliveryResult::failure(Operation::Retrieve, &memo),
                        );
                        Err(Error::HelperRefused(format!(
                            "{}: {}",
                            res.result.status, memo
                        )))
                    }
                }
            }
            Reply::Response(_) => Err(Error::HelperRefused(
                "unexpected response".to_owned(),
            )),
            Reply::Gone(memo) => {
                self.disconnect(&mut state, &memo);
                Err(Error::HelperRefused(memo))
            }
            Reply::Failed(e) => {
                self.transport_failure(&mut state, Operation::Retrieve, &e);
                Err(e.into())
            }
            Reply::Canceled(reason) => Err(Error::RequestCanceled(reason)),
        }
    }

    /// Mark the helper as disconnected on its own initiative.
    pub fn disconnected(&self, reason: &str) {
        let mut state = self.state.lock();
        self.disconnect(&mut state, reason);
    }

    /// Drop a link that is not paired without contacting the
    /// helper, canceling any outstanding request.
    pub(crate) fn drop_local(&self) -> Result<HelperHandle> {
        let mut state = self.state.lock();
        if matches!(
            state.status,
            PairingStatus::Paired | PairingStatus::PendingRemoval
        ) {
            return Err(self.invalid(Operation::Unpair, state.status));
        }
        if state.status != PairingStatus::Removed {
            self.cancel_all(&mut state, CancelReason::Closed);
            self.transition(
                &mut state,
                PairingStatus::Removed,
                NotificationKind::HelperUnpaired,
                "removed without contacting helper",
                Severity::Info,
            );
        }
        Ok(self.handle())
    }

    /// Cancel every outstanding request.
    pub(crate) fn shutdown(&self) {
        let mut state = self.state.lock();
        self.cancel_all(&mut state, CancelReason::Shutdown);
    }

    #[instrument(
        skip_all,
        fields(helper = %self.identity.name(), operation = %operation)
    )]
    async fn exchange(
        &self,
        operation: Operation,
        request: Request,
        mut cancel: watch::Receiver<CancelReason>,
        share_cancel: Option<watch::Receiver<CancelReason>>,
    ) -> Reply {
        let body = match self.context.services.codec.encode_request(request) {
            Ok(body) => body,
            Err(e) => return Reply::Failed(e),
        };

        let timeout = self.context.settings.request_timeout;
        let transport = &self.context.services.transport;
        let share_canceled = async move {
            match share_cancel {
                Some(mut rx) => {
                    let reason = *rx.borrow();
                    if reason != CancelReason::Unknown {
                        return reason;
                    }
                    let _ = rx.changed().await;
                    let reason = *rx.borrow();
                    reason
                }
                None => std::future::pending().await,
            }
        };

        let result = tokio::select! {
            biased;
            _ = cancel.changed() => {
                let reason = *cancel.borrow();
                tracing::debug!(reason = ?reason, "helper_client::canceled");
                return Reply::Canceled(reason);
            }
            reason = share_canceled => {
                tracing::debug!(reason = ?reason, "helper_client::canceled");
                return Reply::Canceled(reason);
            }
            result = tokio::time::timeout(
                timeout,
                transport.send(self.identity.address(), body, timeout),
            ) => result,
        };

        let response = match result {
            Err(_) => {
                return Reply::Failed(custodia_wire::Error::Timeout(timeout))
            }
            Ok(Err(e)) => return Reply::Failed(e),
            Ok(Ok(response)) => response,
        };

        if response.is_gone() {
            return Reply::Gone("helper is gone".to_owned());
        }
        if !response.status.is_success() {
            return Reply::Failed(custodia_wire::Error::ResponseCode(
                response.status,
            ));
        }

        match self
            .context
            .services
            .codec
            .decode_response(&response.body, operation)
        {
            Ok(response) => Reply::Response(response),
            Err(e) => Reply::Failed(e),
        }
    }

    fn on_pair(&self, generation: u64, reply: Reply) {
        let mut state = self.state.lock();
        if !self.finish(&mut state, Operation::Pair, generation)
            || state.status != PairingStatus::Invited
        {
            tracing::debug!(
                helper = %self.identity.name(),
                "helper_client::pair_discarded",
            );
            return;
        }

        match reply {
            Reply::Response(Response::Pair(res)) => {
                let memo = res.result.memo.clone();
                let outcome =
                    ResponsePolicy::outcome(Operation::Pair, res.result.status);
                match outcome {
                    ResponseOutcome::Accept => {
                        match self.open_acceptance(&res.sealed_acceptance) {
                            Ok(()) => {
                                self.record(
                                    &mut state,
                                    DeliveryResult::success(
                                        Operation::Pair,
                                        &memo,
                                    ),
                                );
                                self.transition(
                                    &mut state,
                                    PairingStatus::Paired,
                                    NotificationKind::HelperPaired,
                                    &memo,
                                    Severity::Info,
                                );
                            }
                            Err(e) => {
                                self.fail_pairing(&mut state, &e.to_string())
                            }
                        }
                    }
                    ResponseOutcome::Refuse => {
                        self.record(
                            &mut state,
                            DeliveryResult::failure(Operation::Pair, &memo),
                        );
                        self.transition(
                            &mut state,
                            PairingStatus::Refused,
                            NotificationKind::HelperRefused,
                            &memo,
                            Severity::Warning,
                        );
                    }
                    ResponseOutcome::Fail => {
                        let reason =
                            format!("{}: {}", res.result.status, memo);
                        self.fail_pairing(&mut state, &reason)
                    }
                    ResponseOutcome::Disconnect => {
                        self.disconnect(&mut state, &memo)
                    }
                }
            }
            Reply::Response(_) => {
                self.fail_pairing(&mut state, "unexpected response")
            }
            Reply::Gone(memo) => self.disconnect(&mut state, &memo),
            Reply::Failed(e) => self.fail_pairing(&mut state, &e.to_string()),
            Reply::Canceled(_) => {}
        }
    }

    async fn run_unpair(
        self: Arc<Self>,
        generation: u64,
        cancel: watch::Receiver<CancelReason>,
    ) {
        let retry = self.context.settings.unpair_retry;
        let mut attempt = 0;
        loop {
            let request = Request::Unpair(UnpairRequest {
                secret_id: self.context.id.clone(),
                sharer_key: self.context.sharer_key(),
            });
            let reply = self
                .exchange(Operation::Unpair, request, cancel.clone(), None)
                .await;

            let failure = match reply {
                Reply::Response(res) => {
                    let result = res.result();
                    match ResponsePolicy::outcome(
                        Operation::Unpair,
                        result.status,
                    ) {
                        ResponseOutcome::Accept => {
                            return self.on_unpair(
                                generation,
                                Ok(result.memo.as_str()),
                            );
                        }
                        _ => format!("{}: {}", result.status, result.memo),
                    }
                }
                // Nothing to remove from a helper that left
                Reply::Gone(memo) => {
                    return self.on_unpair(generation, Ok(memo.as_str()));
                }
                Reply::Failed(e) => e.to_string(),
                Reply::Canceled(_) => return,
            };

            attempt += 1;
            if retry.is_exhausted(attempt) {
                return self.on_unpair(generation, Err(failure.as_str()));
            }

            tracing::debug!(
                helper = %self.identity.name(),
                attempt = %attempt,
                failure = %failure,
                "helper_client::unpair_retry",
            );
            if retry.backoff(attempt, cancel.clone()).await.is_err() {
                return;
            }
        }
    }

    fn on_unpair(
        &self,
        generation: u64,
        result: std::result::Result<&str, &str>,
    ) {
        let mut state = self.state.lock();
        if !self.finish(&mut state, Operation::Unpair, generation)
            || state.status != PairingStatus::PendingRemoval
        {
            return;
        }
        match result {
            Ok(memo) => {
                self.record(
                    &mut state,
                    DeliveryResult::success(Operation::Unpair, memo),
                );
                self.cancel_all(&mut state, CancelReason::Closed);
                self.transition(
                    &mut state,
                    PairingStatus::Removed,
                    NotificationKind::HelperUnpaired,
                    memo,
                    Severity::Info,
                );
            }
            Err(reason) => {
                self.record(
                    &mut state,
                    DeliveryResult::failure(Operation::Unpair, reason),
                );
                self.transition(
                    &mut state,
                    PairingStatus::Failed,
                    NotificationKind::UnpairFailed,
                    reason,
                    Severity::Error,
                );
            }
        }
    }

    fn on_store(&self, generation: u64, share: &Share, reply: Reply) {
        let mut state = self.state.lock();
        if !self.finish(&mut state, Operation::Store, generation) {
            // No-op when the version itself was canceled
            share.complete(false, "request canceled");
            return;
        }

        match reply {
            Reply::Response(Response::Store(res)) => {
                let memo = res.result.memo.clone();
                let outcome = ResponsePolicy::outcome(
                    Operation::Store,
                    res.result.status,
                );
                match outcome {
                    ResponseOutcome::Accept
                        if res.version == share.version_number() =>
                    {
                        self.record(
                            &mut state,
                            DeliveryResult::success(Operation::Store, "stored"),
                        );
                        share.complete(true, "stored");
                    }
                    ResponseOutcome::Accept => {
                        let reason = format!(
                            "stored version {}, expected {}",
                            res.version,
                            share.version_number()
                        );
                        self.record(
                            &mut state,
                            DeliveryResult::failure(Operation::Store, &reason),
                        );
                        share.complete(false, reason);
                    }
                    ResponseOutcome::Disconnect => {
                        self.disconnect(&mut state, &memo);
                        share.complete(false, memo);
                    }
                    _ => {
                        let reason =
                            format!("{}: {}", res.result.status, memo);
                        self.record(
                            &mut state,
                            DeliveryResult::failure(Operation::Store, &reason),
                        );
                        share.complete(false, reason);
                    }
                }
            }
            Reply::Response(_) => {
                share.complete(false, "unexpected response");
            }
            Reply::Gone(memo) => {
                self.disconnect(&mut state, &memo);
                share.complete(false, memo);
            }
            Reply::Failed(e) => {
                self.transport_failure(&mut state, Operation::Store, &e);
                share.complete(false, e.to_string());
            }
            Reply::Canceled(reason) => {
                share.complete(false, format!("canceled ({:?})", reason));
            }
        }
    }

    fn on_verify(
        &self,
        generation: u64,
        share: &Share,
        nonce: &[u8],
        reply: Reply,
    ) -> Option<VerifyEntry> {
        let version = share.version_number();
        let mut state = self.state.lock();
        if !self.finish(&mut state, Operation::Verify, generation) {
            tracing::debug!(
                helper = %self.identity.name(),
                version = %version,
                "helper_client::verify_discarded",
            );
            return None;
        }

        let failure = match reply {
            Reply::Response(Response::Verify(res)) => {
                let outcome = ResponsePolicy::outcome(
                    Operation::Verify,
                    res.result.status,
                );
                match outcome {
                    ResponseOutcome::Accept
                        if res.version == version && res.nonce == nonce =>
                    {
                        None
                    }
                    ResponseOutcome::Accept => {
                        Some("nonce or version mismatch".to_owned())
                    }
                    ResponseOutcome::Disconnect => {
                        self.disconnect(&mut state, &res.result.memo);
                        Some(res.result.memo.clone())
                    }
                    _ => Some(format!(
                        "{}: {}",
                        res.result.status, res.result.memo
                    )),
                }
            }
            Reply::Response(_) => Some("unexpected response".to_owned()),
            Reply::Gone(memo) => {
                self.disconnect(&mut state, &memo);
                Some(memo)
            }
            Reply::Failed(e) => {
                self.transport_failure(&mut state, Operation::Verify, &e);
                Some(e.to_string())
            }
            Reply::Canceled(_) => return None,
        };

        let result = match &failure {
            None => DeliveryResult::success(Operation::Verify, "verified"),
            Some(reason) => DeliveryResult::failure(Operation::Verify, reason),
        };
        share.record_verification(result.clone());
        self.record(&mut state, result);

        let notification = Notification::new(
            NotificationKind::VerifyProgress,
            self.context.id.clone(),
        )
        .with_version(version)
        .with_helper(self.identity.clone());
        match failure {
            None => {
                self.context
                    .bus
                    .emit(notification.with_message("verified"));
                Some(self.verify_entry(version, true, ""))
            }
            Some(reason) => {
                self.context.bus.emit(
                    notification
                        .with_message(&reason)
                        .with_severity(Severity::Warning),
                );
                self.context.bus.emit(
                    Notification::new(
                        NotificationKind::HelperUnhealthy,
                        self.context.id.clone(),
                    )
                    .with_version(version)
                    .with_helper(self.identity.clone())
                    .with_message(&reason)
                    .with_severity(Severity::Warning),
                );
                Some(self.verify_entry(version, false, &reason))
            }
        }
    }

    fn verify_entry(
        &self,
        version: u64,
        healthy: bool,
        message: &str,
    ) -> VerifyEntry {
        VerifyEntry {
            helper: self.identity.clone(),
            version,
            healthy,
            message: message.to_owned(),
        }
    }

    fn open_acceptance(&self, sealed: &[u8]) -> Result<()> {
        let token = self.context.services.cipher.open(sealed)?;
        let expected = acceptance_token(&self.context.id, self.identity.name());
        if token != expected {
            return Err(Error::HelperRefused(
                "acceptance does not match the pairing".to_owned(),
            ));
        }
        Ok(())
    }

    fn fail_pairing(&self, state: &mut ClientState, reason: &str) {
        self.record(state, DeliveryResult::failure(Operation::Pair, reason));
        self.transition(
            state,
            PairingStatus::Failed,
            NotificationKind::HelperFailed,
            reason,
            Severity::Warning,
        );
    }

    /// A transport level failure drives a paired link to `Failed`.
    fn transport_failure(
        &self,
        state: &mut ClientState,
        operation: Operation,
        error: &custodia_wire::Error,
    ) {
        let reason = error.to_string();
        self.record(state, DeliveryResult::failure(operation, &reason));
        if state.status.is_paired() {
            self.transition(
                state,
                PairingStatus::Failed,
                NotificationKind::HelperFailed,
                &reason,
                Severity::Warning,
            );
        }
    }

    fn disconnect(&self, state: &mut ClientState, reason: &str) {
        if matches!(
            state.status,
            PairingStatus::Gone | PairingStatus::Removed
        ) {
            return;
        }
        self.cancel_all(state, CancelReason::Closed);
        self.transition(
            state,
            PairingStatus::Gone,
            NotificationKind::HelperGone,
            reason,
            Severity::Warning,
        );
    }

    /// Announce a helper event before the status change so the
    /// availability of the secret follows its cause on the bus.
    fn transition(
        &self,
        state: &mut ClientState,
        status: PairingStatus,
        kind: NotificationKind,
        message: &str,
        severity: Severity,
    ) {
        self.emit(kind, message, severity);
        self.set_status(state, status);
    }

    fn set_status(&self, state: &mut ClientState, status: PairingStatus) {
        let old = state.status;
        if old == status {
            return;
        }
        state.status = status;
        self.status.send_replace(status);
        tracing::debug!(
            secret_id = %self.context.id,
            helper = %self.identity.name(),
            from = %old,
            to = %status,
            "helper_client::status",
        );
        self.context.availability.status_changed(old, status);
    }

    fn begin(
        &self,
        state: &mut ClientState,
        operation: Operation,
    ) -> (u64, watch::Receiver<CancelReason>) {
        state.generation += 1;
        let generation = state.generation;
        let (cancel, rx) = watch::channel(CancelReason::default());
        if let Some(previous) =
            state.inflight.insert(operation, Inflight { generation, cancel })
        {
            previous.cancel.send_replace(CancelReason::Superseded);
        }
        (generation, rx)
    }

    /// Remove the in-flight entry for a reply, returns `false`
    /// when the request was superseded or canceled.
    fn finish(
        &self,
        state: &mut ClientState,
        operation: Operation,
        generation: u64,
    ) -> bool {
        match state.inflight.get(&operation) {
            Some(inflight) if inflight.generation == generation => {
                state.inflight.remove(&operation);
                true
            }
            _ => false,
        }
    }

    fn cancel_all(&self, state: &mut ClientState, reason: CancelReason) {
        for (_, inflight) in state.inflight.drain() {
            inflight.cancel.send_replace(reason);
        }
    }

    fn record(&self, state: &mut ClientState, result: DeliveryResult) {
        state.last_result = Some(result);
    }

    fn emit(&self, kind: NotificationKind, message: &str, severity: Severity) {
        self.context.bus.emit(
            Notification::new(kind, self.context.id.clone())
                .with_helper(self.identity.clone())
                .with_message(message)
                .with_severity(severity),
        );
    }

    fn invalid(&self, operation: Operation, status: PairingStatus) -> Error {
        Error::InvalidStateTransition {
            helper: self.identity.name().to_owned(),
            operation,
            status,
        }
    }
}

impl fmt::Debug for HelperClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HelperClient")
            .field("identity", &self.identity)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
