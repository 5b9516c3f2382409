//! Coordinator for one protected secret.
use crate::{
    client::{HelperClient, HelperHandle, VerifyEntry},
    context::SecretContext,
    notification::{Notification, NotificationKind, Severity},
    version::{Version, VersionOutcome},
    Error, Result,
};
use custodia_types::{HelperIdentity, PairingStatus, SecretId};
use custodia_wire::CancelReason;
use futures::{
    future::join_all,
    stream::{FuturesUnordered, StreamExt},
};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use secrecy::SecretSlice;
use std::{
    collections::{BTreeMap, HashSet},
    fmt,
    sync::{Arc, Weak},
    time::Duration,
};
use tokio::{sync::oneshot, task::JoinHandle};

/// Result of closing a secret.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct CloseOutcome {
    /// Helpers that confirmed the removal.
    pub removed: usize,
    /// Helpers that could not be removed.
    pub failed: usize,
    /// Whether enough helpers confirmed the removal to
    /// meet the deletion threshold.
    pub deleted: bool,
}

/// Pending close of a secret.
#[derive(Debug)]
pub struct CloseHandle {
    outcome: oneshot::Receiver<CloseOutcome>,
}

impl CloseHandle {
    /// Wait until every removal has resolved.
    pub async fn resolved(self) -> Result<CloseOutcome> {
        self.outcome
            .await
            .map_err(|_| Error::RequestCanceled(CancelReason::Shutdown))
    }
}

/// Result of one verification sweep.
#[derive(Debug, Clone)]
pub struct VerifyReport {
    /// Version that was verified.
    pub version: u64,
    /// One entry per helper that answered, verifications
    /// superseded by a newer one are left out.
    pub entries: Vec<VerifyEntry>,
}

impl VerifyReport {
    /// Whether every helper that was asked is healthy.
    pub fn is_healthy(&self) -> bool {
        self.entries.iter().all(|entry| entry.healthy)
    }

    /// Helpers that failed verification.
    pub fn unhealthy(&self) -> impl Iterator<Item = &VerifyEntry> {
        self.entries.iter().filter(|entry| !entry.healthy)
    }
}

#[derive(Default)]
struct SecretState {
    roster: IndexMap<HelperIdentity, Arc<HelperClient>>,
    versions: BTreeMap<u64, Arc<Version>>,
    closed: bool,
}

impl SecretState {
    fn paired(&self) -> Vec<Arc<HelperClient>> {
        self.roster
            .values()
            .filter(|client| client.status().is_paired())
            .cloned()
            .collect()
    }

    fn latest_protected(&self) -> Option<Arc<Version>> {
        self.versions
            .values()
            .rev()
            .find(|version| version.is_protected())
            .cloned()
    }
}

/// Secret distributed as fragments to a roster of helpers.
///
/// Pairing and sharing are decoupled; helpers are paired with
/// [Secret::add_helpers] and each call to [Secret::update]
/// splits a new version across the helpers that are paired at
/// that moment.
pub struct Secret {
    context: Arc<SecretContext>,
    state: RwLock<SecretState>,
    verifier: Mutex<Option<JoinHandle<()>>>,
}

impl Secret {
    pub(crate) fn new(context: SecretContext) -> Arc<Self> {
        let interval = context.settings.verify_interval;
        let secret = Arc::new(Self {
            context: Arc::new(context),
            state: RwLock::new(Default::default()),
            verifier: Mutex::new(None),
        });
        if let Some(interval) = interval {
            let task = tokio::spawn(verify_periodically(
                Arc::downgrade(&secret),
                interval,
            ));
            *secret.verifier.lock() = Some(task);
        }
        secret
    }

    /// Secret identifier.
    pub fn id(&self) -> &SecretId {
        &self.context.id
    }

    /// Description sent to helpers when pairing.
    pub fn description(&self) -> &str {
        &self.context.description
    }

    /// Fragments required to recover a version.
    pub fn recovery_threshold(&self) -> usize {
        self.context.recovery_threshold
    }

    /// Confirmed removals required to consider the
    /// secret deleted.
    pub fn deletion_threshold(&self) -> usize {
        self.context.deletion_threshold
    }

    /// Whether the secret has been closed.
    pub fn is_closed(&self) -> bool {
        self.state.read().closed
    }

    /// Whether enough helpers are paired to protect a version.
    pub fn is_available(&self) -> bool {
        let state = self.state.read();
        !state.closed
            && state.paired().len() >= self.context.recovery_threshold
    }

    /// Snapshot of the pairing status of every helper.
    pub fn helper_statuses(&self) -> IndexMap<HelperIdentity, PairingStatus> {
        self.state
            .read()
            .roster
            .iter()
            .map(|(identity, client)| (identity.clone(), client.status()))
            .collect()
    }

    /// Client for a helper on the roster.
    pub fn helper(
        &self,
        identity: &HelperIdentity,
    ) -> Option<Arc<HelperClient>> {
        self.state.read().roster.get(identity).cloned()
    }

    /// Snapshot of all versions in ascending order.
    pub fn versions(&self) -> Vec<Arc<Version>> {
        self.state.read().versions.values().cloned().collect()
    }

    /// Version by number.
    pub fn version(&self, number: u64) -> Option<Arc<Version>> {
        self.state.read().versions.get(&number).cloned()
    }

    /// Most recent version.
    pub fn latest_version(&self) -> Option<Arc<Version>> {
        self.state.read().versions.values().next_back().cloned()
    }

    /// Add helpers to the roster and start pairing with them.
    ///
    /// Fails without adding any helper when one of them is
    /// already on the roster; a helper whose removal was
    /// confirmed may be added again.
    pub fn start_add_helpers(
        &self,
        identities: impl IntoIterator<Item = HelperIdentity>,
    ) -> Result<Vec<HelperHandle>> {
        let identities: Vec<HelperIdentity> = identities.into_iter().collect();
        let mut state = self.state.write();
        if state.closed {
            return Err(Error::SecretClosed(self.context.id.clone()));
        }

        let mut seen = HashSet::new();
        for identity in &identities {
            let on_roster = state
                .roster
                .get(identity)
                .map(|client| client.status() != PairingStatus::Removed)
                .unwrap_or(false);
            if on_roster || !seen.insert(identity) {
                return Err(Error::DuplicateHelper(identity.name().to_owned()));
            }
        }

        tracing::debug!(
            secret_id = %self.context.id,
            helpers = %identities.len(),
            "secret::add_helpers",
        );

        let mut handles = Vec::with_capacity(identities.len());
        for identity in identities {
            let client =
                HelperClient::new(identity.clone(), Arc::clone(&self.context));
            state.roster.insert(identity, Arc::clone(&client));
            handles.push(client.pair()?);
        }
        Ok(handles)
    }

    /// Add helpers and wait until every pairing attempt resolves.
    pub async fn add_helpers(
        &self,
        identities: impl IntoIterator<Item = HelperIdentity>,
    ) -> Result<Vec<(HelperIdentity, PairingStatus)>> {
        let handles = self.start_add_helpers(identities)?;
        Ok(resolve_all(handles).await)
    }

    /// Pair again with helpers whose previous attempt failed.
    ///
    /// Helpers that are not on the roster are ignored.
    pub fn retry_pairing(
        &self,
        identities: impl IntoIterator<Item = HelperIdentity>,
    ) -> Result<Vec<HelperHandle>> {
        let state = self.state.read();
        if state.closed {
            return Err(Error::SecretClosed(self.context.id.clone()));
        }
        let mut handles = Vec::new();
        for identity in identities {
            if let Some(client) = state.roster.get(&identity) {
                handles.push(client.pair()?);
            }
        }
        Ok(handles)
    }

    /// Start removing helpers from the roster.
    ///
    /// Paired helpers are asked to delete their fragments; helpers
    /// that never paired are dropped without contacting them.
    /// Helpers that are not on the roster are ignored.
    pub fn start_remove_helpers(
        &self,
        identities: impl IntoIterator<Item = HelperIdentity>,
    ) -> Result<Vec<HelperHandle>> {
        let state = self.state.read();
        let mut handles = Vec::new();
        for identity in identities {
            let Some(client) = state.roster.get(&identity) else {
                continue;
            };
            tracing::debug!(
                secret_id = %self.context.id,
                helper = %identity.name(),
                status = %client.status(),
                "secret::remove_helper",
            );
            match client.status() {
                PairingStatus::Paired => handles.push(client.unpair()?),
                PairingStatus::PendingRemoval => handles.push(client.handle()),
                PairingStatus::Removed => {}
                _ => handles.push(client.drop_local()?),
            }
        }
        Ok(handles)
    }

    /// Remove helpers and wait until every removal resolves.
    pub async fn remove_helpers(
        &self,
        identities: impl IntoIterator<Item = HelperIdentity>,
    ) -> Result<Vec<(HelperIdentity, PairingStatus)>> {
        let handles = self.start_remove_helpers(identities)?;
        Ok(resolve_all(handles).await)
    }

    /// Publish a new version of the secret.
    ///
    /// Cancels the previous version if it has not resolved, then
    /// splits the value across every paired helper.
    pub fn start_update(
        &self,
        value: impl Into<Vec<u8>>,
        description: Option<String>,
    ) -> Result<Arc<Version>> {
        let value = value.into();
        let threshold = self.context.recovery_threshold;

        let (version, deliveries) = {
            let mut state = self.state.write();
            if state.closed {
                return Err(Error::SecretClosed(self.context.id.clone()));
            }

            if let Some(previous) = state.versions.values().next_back() {
                if previous.cancel(CancelReason::Superseded) {
                    tracing::debug!(
                        secret_id = %self.context.id,
                        version = %previous.number(),
                        "secret::cancel_previous",
                    );
                }
            }

            let paired = state.paired();
            if paired.len() < threshold {
                return Err(Error::InsufficientHelpers {
                    paired: paired.len(),
                    threshold,
                });
            }

            let fragments = self.context.services.provider.split(
                &value,
                paired.len(),
                threshold,
            )?;
            let number = state
                .versions
                .keys()
                .next_back()
                .map(|number| number + 1)
                .unwrap_or(1);

            let version = Version::new(
                number,
                self.context.id.clone(),
                description,
                value,
                threshold,
                paired
                    .iter()
                    .map(|client| client.identity().clone())
                    .zip(fragments)
                    .collect(),
                self.context.bus.clone(),
            );
            state.versions.insert(number, Arc::clone(&version));

            let deliveries: Vec<_> = paired
                .into_iter()
                .zip(version.shares().iter().cloned())
                .collect();
            (version, deliveries)
        };

        tracing::debug!(
            secret_id = %self.context.id,
            version = %version.number(),
            helpers = %deliveries.len(),
            "secret::update",
        );

        for (client, share) in deliveries {
            if let Err(e) = client.send(Arc::clone(&share)) {
                share.complete(false, e.to_string());
            }
        }
        Ok(version)
    }

    /// Publish a new version and wait until it resolves.
    pub async fn update(
        &self,
        value: impl Into<Vec<u8>>,
        description: Option<String>,
    ) -> Result<VersionOutcome> {
        let version = self.start_update(value, description)?;
        Ok(version.resolved().await)
    }

    /// Ask every paired helper holding the latest protected
    /// version to prove it still holds its fragment.
    ///
    /// Resolves to `None` when no version is protected.
    pub async fn verify_now(&self) -> Result<Option<VerifyReport>> {
        let (number, receivers) = {
            let state = self.state.read();
            if state.closed {
                return Err(Error::SecretClosed(self.context.id.clone()));
            }
            let Some(version) = state.latest_protected() else {
                return Ok(None);
            };
            let number = version.number();
            let mut receivers = Vec::new();
            for client in state.paired() {
                let Some(share) = client.share(number) else {
                    continue;
                };
                if !share.is_delivered() {
                    continue;
                }
                match client.verify(share) {
                    Ok(rx) => receivers.push(rx),
                    Err(e) => tracing::debug!(
                        error = %e,
                        "secret::verify_skipped",
                    ),
                }
            }
            (number, receivers)
        };

        tracing::debug!(
            secret_id = %self.context.id,
            version = %number,
            helpers = %receivers.len(),
            "secret::verify",
        );

        let entries = join_all(receivers)
            .await
            .into_iter()
            .filter_map(|entry| entry.ok())
            .collect();
        Ok(Some(VerifyReport {
            version: number,
            entries,
        }))
    }

    /// Recover a protected version, the latest protected version
    /// when no number is given.
    ///
    /// Fragments are retrieved concurrently from the paired
    /// helpers holding the version until the recovery threshold
    /// is met.
    pub async fn recover(
        &self,
        number: Option<u64>,
    ) -> Result<SecretSlice<u8>> {
        let (number, clients) = {
            let state = self.state.read();
            if state.closed {
                return Err(Error::SecretClosed(self.context.id.clone()));
            }
            let version = match number {
                Some(number) => state
                    .versions
                    .get(&number)
                    .filter(|version| version.is_protected())
                    .cloned()
                    .ok_or(Error::VersionNotFound(number))?,
                None => state
                    .latest_protected()
                    .ok_or(Error::VersionNotFound(0))?,
            };
            let number = version.number();
            let clients: Vec<_> = state
                .paired()
                .into_iter()
                .filter(|client| {
                    client
                        .share(number)
                        .map(|share| share.is_delivered())
                        .unwrap_or(false)
                })
                .collect();
            (number, clients)
        };

        let threshold = self.context.recovery_threshold;
        tracing::debug!(
            secret_id = %self.context.id,
            version = %number,
            helpers = %clients.len(),
            threshold = %threshold,
            "secret::recover",
        );

        let mut fragments = Vec::with_capacity(threshold);
        {
            let mut pending: FuturesUnordered<_> = clients
                .iter()
                .map(|client| async move {
                    (client.identity().name(), client.retrieve(number).await)
                })
                .collect();
            while let Some((helper, result)) = pending.next().await {
                match result {
                    Ok(fragment) => {
                        fragments.push(fragment);
                        if fragments.len() >= threshold {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!(
                        helper = %helper,
                        error = %e,
                        "secret::retrieve_failed",
                    ),
                }
            }
        }

        if fragments.len() < threshold {
            return Err(Error::RecoveryFailed {
                version: number,
                have: fragments.len(),
                need: threshold,
            });
        }

        let value = self.context.services.provider.combine(&fragments)?;
        Ok(SecretSlice::from(value))
    }

    /// Record that a helper disconnected, learned out of band.
    pub fn helper_gone(&self, identity: &HelperIdentity) {
        if let Some(client) = self.state.read().roster.get(identity) {
            client.disconnected("reported by application");
        }
    }

    /// Close the secret and start removing every helper.
    pub fn start_close(&self) -> Result<CloseHandle> {
        let handles = {
            let mut state = self.state.write();
            if state.closed {
                return Err(Error::SecretClosed(self.context.id.clone()));
            }
            state.closed = true;

            if let Some(latest) = state.versions.values().next_back() {
                latest.cancel(CancelReason::Closed);
            }
            if let Some(task) = self.verifier.lock().take() {
                task.abort();
            }
            self.context.availability.close();

            tracing::debug!(
                secret_id = %self.context.id,
                helpers = %state.roster.len(),
                "secret::close",
            );

            let mut handles = Vec::new();
            for client in state.roster.values() {
                let result = match client.status() {
                    PairingStatus::Paired => client.unpair().map(Some),
                    PairingStatus::PendingRemoval => Ok(Some(client.handle())),
                    PairingStatus::Removed => Ok(None),
                    _ => client.drop_local().map(|_| None),
                };
                match result {
                    Ok(Some(handle)) => handles.push(handle),
                    Ok(None) => {}
                    Err(e) => tracing::warn!(
                        helper = %client.identity().name(),
                        error = %e,
                        "secret::close_helper",
                    ),
                }
            }
            handles
        };

        let (tx, rx) = oneshot::channel();
        let context = Arc::clone(&self.context);
        tokio::spawn(async move {
            let statuses = resolve_all(handles).await;
            let removed = statuses
                .iter()
                .filter(|(_, status)| *status == PairingStatus::Removed)
                .count();
            let outcome = CloseOutcome {
                removed,
                failed: statuses.len() - removed,
                deleted: removed >= context.deletion_threshold,
            };
            context.bus.emit(
                Notification::new(
                    NotificationKind::SecretClosed,
                    context.id.clone(),
                )
                .with_message(format!(
                    "{} helpers removed, {} failed",
                    outcome.removed, outcome.failed
                ))
                .with_severity(if outcome.deleted {
                    Severity::Info
                } else {
                    Severity::Warning
                }),
            );
            let _ = tx.send(outcome);
        });
        Ok(CloseHandle { outcome: rx })
    }

    /// Close the secret and wait until every removal resolves.
    pub async fn close(&self) -> Result<CloseOutcome> {
        self.start_close()?.resolved().await
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        if let Some(task) = self.verifier.lock().take() {
            task.abort();
        }
        for client in self.state.read().roster.values() {
            client.shutdown();
        }
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Secret")
            .field("id", &self.context.id)
            .field("helpers", &state.roster.len())
            .field("versions", &state.versions.len())
            .field("closed", &state.closed)
            .finish()
    }
}

async fn resolve_all(
    handles: Vec<HelperHandle>,
) -> Vec<(HelperIdentity, PairingStatus)> {
    join_all(handles.into_iter().map(|handle| async move {
        let identity = handle.identity().clone();
        (identity, handle.resolved().await)
    }))
    .await
}

async fn verify_periodically(secret: Weak<Secret>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    // First tick completes immediately
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let Some(secret) = secret.upgrade() else {
            break;
        };
        match secret.verify_now().await {
            Ok(Some(report)) if !report.is_healthy() => tracing::warn!(
                secret_id = %secret.id(),
                version = %report.version,
                unhealthy = %report.unhealthy().count(),
                "secret::verify_sweep",
            ),
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, "secret::verify_sweep");
                break;
            }
        }
    }
}
