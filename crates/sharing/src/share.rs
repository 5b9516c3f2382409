//! Delivery of one fragment of a version to one helper.
use crate::version::Version;
use custodia_fragments::Fragment;
use custodia_types::{DeliveryResult, HelperIdentity, Operation};
use custodia_wire::CancelReason;
use parking_lot::Mutex;
use std::{
    fmt,
    sync::{Arc, Weak},
};
use tokio::sync::watch;

/// Channel used to cancel an in-flight request.
pub type CancelChannel = watch::Sender<CancelReason>;

/// State of a fragment delivery.
#[derive(Debug, Default, Clone, Copy, Hash, Eq, PartialEq)]
pub enum DeliveryState {
    /// Waiting for the helper to acknowledge the fragment.
    #[default]
    Pending,
    /// Helper stored the fragment.
    Delivered,
    /// Delivery failed.
    Failed,
    /// Version was superseded before the delivery completed.
    Canceled,
}

impl DeliveryState {
    /// Whether the delivery has completed.
    pub fn is_complete(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Default)]
struct ShareResults {
    delivery: Option<DeliveryResult>,
    verification: Option<DeliveryResult>,
}

/// Fragment of a version addressed to one helper.
pub struct Share {
    version: Weak<Version>,
    number: u64,
    helper: HelperIdentity,
    fragment: Fragment,
    state: watch::Sender<DeliveryState>,
    cancel: CancelChannel,
    results: Mutex<ShareResults>,
}

impl Share {
    pub(crate) fn new(
        version: Weak<Version>,
        number: u64,
        helper: HelperIdentity,
        fragment: Fragment,
    ) -> Self {
        let (state, _) = watch::channel(DeliveryState::Pending);
        let (cancel, _) = watch::channel(CancelReason::default());
        Self {
            version,
            number,
            helper,
            fragment,
            state,
            cancel,
            results: Mutex::new(Default::default()),
        }
    }

    /// Number of the version this fragment belongs to.
    pub fn version_number(&self) -> u64 {
        self.number
    }

    /// Helper the fragment is addressed to.
    pub fn helper(&self) -> &HelperIdentity {
        &self.helper
    }

    /// Current delivery state.
    pub fn state(&self) -> DeliveryState {
        *self.state.borrow()
    }

    /// Whether the helper acknowledged the fragment.
    pub fn is_delivered(&self) -> bool {
        matches!(self.state(), DeliveryState::Delivered)
    }

    /// Result of the store request.
    pub fn last_result(&self) -> Option<DeliveryResult> {
        self.results.lock().delivery.clone()
    }

    /// Result of the latest verify request.
    pub fn last_verification(&self) -> Option<DeliveryResult> {
        self.results.lock().verification.clone()
    }

    /// Wait for the delivery to complete.
    pub async fn completed(&self) -> DeliveryState {
        let mut rx = self.state.subscribe();
        let result = rx.wait_for(|state| state.is_complete()).await.map(|s| *s);
        result.unwrap_or_else(|_| self.state())
    }

    pub(crate) fn fragment(&self) -> &Fragment {
        &self.fragment
    }

    pub(crate) fn version(&self) -> Option<Arc<Version>> {
        self.version.upgrade()
    }

    pub(crate) fn cancel_receiver(&self) -> watch::Receiver<CancelReason> {
        self.cancel.subscribe()
    }

    /// Cancel the in-flight request, a pending delivery is
    /// marked canceled.
    pub(crate) fn cancel(&self, reason: CancelReason) {
        self.cancel.send_replace(reason);
        self.state.send_if_modified(|state| {
            if matches!(state, DeliveryState::Pending) {
                *state = DeliveryState::Canceled;
                true
            } else {
                false
            }
        });
    }

    /// Record the outcome of the store request and report it
    /// to the owning version.
    ///
    /// Completing a delivery that is no longer pending is a no-op.
    pub(crate) fn complete(&self, success: bool, message: impl Into<String>) {
        let message = message.into();
        let applied = self.state.send_if_modified(|state| {
            if matches!(state, DeliveryState::Pending) {
                *state = if success {
                    DeliveryState::Delivered
                } else {
                    DeliveryState::Failed
                };
                true
            } else {
                false
            }
        });
        if !applied {
            tracing::debug!(
                version = %self.number,
                helper = %self.helper.name(),
                "share::discard_completion",
            );
            return;
        }

        self.results.lock().delivery = Some(if success {
            DeliveryResult::success(Operation::Store, &message)
        } else {
            DeliveryResult::failure(Operation::Store, &message)
        });

        if let Some(version) = self.version() {
            version.complete(&self.helper, success, &message);
        }
    }

    pub(crate) fn record_verification(&self, result: DeliveryResult) {
        self.results.lock().verification = Some(result);
    }
}

impl fmt::Debug for Share {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Share")
            .field("version", &self.number)
            .field("helper", &self.helper.name())
            .field("fragment", &self.fragment)
            .field("state", &self.state())
            .finish()
    }
}
