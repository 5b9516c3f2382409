//! Versions of a secret and their quorum.
use crate::{
    notification::{Notification, NotificationBus, NotificationKind, Severity},
    share::Share,
};
use custodia_fragments::Fragment;
use custodia_types::{HelperIdentity, SecretId, UtcDateTime};
use custodia_wire::CancelReason;
use parking_lot::Mutex;
use secrecy::SecretSlice;
use std::{fmt, sync::Arc};
use tokio::sync::watch;

/// Resolution state of a version.
#[derive(Debug, Default, Clone, Copy, Hash, Eq, PartialEq)]
pub enum VersionState {
    /// Waiting for acknowledgements.
    #[default]
    Pending,
    /// Recovery threshold of helpers acknowledged their fragment.
    Protected,
    /// Recovery threshold can no longer be reached.
    Failed,
    /// Superseded by a newer version before resolving.
    Canceled,
}

impl VersionState {
    /// Whether the version has resolved.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for VersionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Pending => "pending",
                Self::Protected => "protected",
                Self::Failed => "failed",
                Self::Canceled => "canceled",
            }
        )
    }
}

/// Snapshot of the counters of a version.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct VersionOutcome {
    /// Version number.
    pub number: u64,
    /// Resolution state.
    pub state: VersionState,
    /// Number of fragments created.
    pub deliveries: usize,
    /// Number of fragments sent.
    pub sent: usize,
    /// Number of acknowledged deliveries.
    pub success: usize,
    /// Number of failed deliveries.
    pub failure: usize,
}

impl VersionOutcome {
    /// Whether the version is protected.
    pub fn is_protected(&self) -> bool {
        matches!(self.state, VersionState::Protected)
    }
}

#[derive(Debug, Default)]
struct Tally {
    sent: usize,
    success: usize,
    failure: usize,
    state: VersionState,
}

/// One value of a secret distributed as fragments.
pub struct Version {
    number: u64,
    secret_id: SecretId,
    description: Option<String>,
    created: UtcDateTime,
    value: SecretSlice<u8>,
    threshold: usize,
    shares: Vec<Arc<Share>>,
    tally: Mutex<Tally>,
    state: watch::Sender<VersionState>,
    bus: NotificationBus,
}

impl Version {
    /// Create a version with one share per fragment.
    pub(crate) fn new(
        number: u64,
        secret_id: SecretId,
        description: Option<String>,
        value: Vec<u8>,
        threshold: usize,
        fragments: Vec<(HelperIdentity, Fragment)>,
        bus: NotificationBus,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(VersionState::Pending);
        Arc::new_cyclic(|version| {
            let shares = fragments
                .into_iter()
                .map(|(helper, fragment)| {
                    Arc::new(Share::new(
                        version.clone(),
                        number,
                        helper,
                        fragment,
                    ))
                })
                .collect();
            Self {
                number,
                secret_id,
                description,
                created: UtcDateTime::now(),
                value: SecretSlice::from(value),
                threshold,
                shares,
                tally: Mutex::new(Default::default()),
                state,
                bus,
            }
        })
    }

    /// Version number.
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Description of this version.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// When the version was created.
    pub fn created(&self) -> &UtcDateTime {
        &self.created
    }

    /// Protected value.
    pub fn value(&self) -> &SecretSlice<u8> {
        &self.value
    }

    /// Acknowledgements required to protect this version.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Fragment deliveries of this version.
    pub fn shares(&self) -> &[Arc<Share>] {
        &self.shares
    }

    /// Delivery for a helper.
    pub fn share(&self, helper: &HelperIdentity) -> Option<&Arc<Share>> {
        self.shares.iter().find(|s| s.helper() == helper)
    }

    /// Current resolution state.
    pub fn state(&self) -> VersionState {
        self.tally.lock().state
    }

    /// Whether the version resolved.
    pub fn is_resolved(&self) -> bool {
        self.state().is_resolved()
    }

    /// Whether the version is protected.
    pub fn is_protected(&self) -> bool {
        matches!(self.state(), VersionState::Protected)
    }

    /// Snapshot of the counters.
    pub fn outcome(&self) -> VersionOutcome {
        let tally = self.tally.lock();
        VersionOutcome {
            number: self.number,
            state: tally.state,
            deliveries: self.shares.len(),
            sent: tally.sent,
            success: tally.success,
            failure: tally.failure,
        }
    }

    /// Wait until the version resolves.
    pub async fn resolved(&self) -> VersionOutcome {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|state| state.is_resolved()).await;
        self.outcome()
    }

    pub(crate) fn mark_sent(&self) {
        self.tally.lock().sent += 1;
    }

    /// Fold the outcome of one delivery into the quorum.
    pub(crate) fn complete(
        &self,
        helper: &HelperIdentity,
        success: bool,
        message: &str,
    ) {
        let mut tally = self.tally.lock();
        if matches!(tally.state, VersionState::Canceled) {
            tracing::debug!(
                version = %self.number,
                helper = %helper.name(),
                "version::discard_canceled",
            );
            return;
        }

        if success {
            tally.success += 1;
        } else {
            tally.failure += 1;
        }

        let total = self.shares.len();
        tracing::debug!(
            secret_id = %self.secret_id,
            version = %self.number,
            helper = %helper.name(),
            success = %tally.success,
            failure = %tally.failure,
            total = %total,
            "version::complete",
        );

        self.bus.emit(
            self.notification(NotificationKind::UpdateProgress)
                .with_helper(helper.clone())
                .with_message(message)
                .with_severity(if success {
                    Severity::Info
                } else {
                    Severity::Warning
                }),
        );

        if !tally.state.is_resolved() {
            if tally.success >= self.threshold {
                tally.state = VersionState::Protected;
                self.bus.emit(
                    self.notification(NotificationKind::UpdateAvailable)
                        .with_message(format!(
                            "{} of {} helpers acknowledged",
                            tally.success, total
                        )),
                );
                self.state.send_replace(VersionState::Protected);
            } else if total.saturating_sub(tally.failure) < self.threshold {
                tally.state = VersionState::Failed;
                self.bus.emit(
                    self.notification(NotificationKind::UpdateFailed)
                        .with_message(format!(
                            "{} of {} helpers failed, threshold is {}",
                            tally.failure, total, self.threshold
                        ))
                        .with_severity(Severity::Error),
                );
                self.state.send_replace(VersionState::Failed);
            }
        }

        if tally.success + tally.failure == total {
            self.bus.emit(
                self.notification(NotificationKind::UpdateComplete)
                    .with_message(format!(
                        "{} succeeded, {} failed",
                        tally.success, tally.failure
                    )),
            );
        }
    }

    /// Cancel an unresolved version.
    ///
    /// Returns `false` if the version had already resolved.
    pub(crate) fn cancel(&self, reason: CancelReason) -> bool {
        {
            let mut tally = self.tally.lock();
            if tally.state.is_resolved() {
                return false;
            }
            tally.state = VersionState::Canceled;
            self.bus.emit(
                self.notification(NotificationKind::UpdateCanceled)
                    .with_message(format!("{:?}", reason))
                    .with_severity(Severity::Warning),
            );
            self.state.send_replace(VersionState::Canceled);
        }
        for share in &self.shares {
            share.cancel(reason);
        }
        true
    }

    fn notification(&self, kind: NotificationKind) -> Notification {
        Notification::new(kind, self.secret_id.clone())
            .with_version(self.number)
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Version")
            .field("number", &self.number)
            .field("secret_id", &self.secret_id)
            .field("threshold", &self.threshold)
            .field("outcome", &self.outcome())
            .finish_non_exhaustive()
    }
}
