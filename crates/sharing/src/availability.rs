//! Availability of a secret from its paired helpers.
use crate::notification::{
    Notification, NotificationBus, NotificationKind, Severity,
};
use custodia_types::{PairingStatus, SecretId};
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct AvailabilityState {
    paired: usize,
    closed: bool,
    available: bool,
}

/// Tracks the number of paired helpers of a secret and emits a
/// notification whenever availability changes.
#[derive(Debug)]
pub(crate) struct AvailabilityTracker {
    secret_id: SecretId,
    threshold: usize,
    bus: NotificationBus,
    state: Mutex<AvailabilityState>,
}

impl AvailabilityTracker {
    pub fn new(
        secret_id: SecretId,
        threshold: usize,
        bus: NotificationBus,
    ) -> Self {
        Self {
            secret_id,
            threshold,
            bus,
            state: Mutex::new(Default::default()),
        }
    }

    /// Record a pairing status transition of one helper.
    pub fn status_changed(&self, old: PairingStatus, new: PairingStatus) {
        let mut state = self.state.lock();
        if old.is_paired() {
            state.paired = state.paired.saturating_sub(1);
        }
        if new.is_paired() {
            state.paired += 1;
        }
        self.evaluate(&mut state);
    }

    /// Mark the secret closed.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.evaluate(&mut state);
    }

    /// Whether the secret was available at the last transition.
    #[cfg(test)]
    pub fn is_available(&self) -> bool {
        self.state.lock().available
    }

    fn evaluate(&self, state: &mut AvailabilityState) {
        let available = !state.closed && state.paired >= self.threshold;
        if available == state.available {
            return;
        }
        state.available = available;
        let notification = if available {
            Notification::new(
                NotificationKind::SecretAvailable,
                self.secret_id.clone(),
            )
            .with_message(format!(
                "{} helpers paired, threshold is {}",
                state.paired, self.threshold
            ))
        } else {
            Notification::new(
                NotificationKind::SecretUnavailable,
                self.secret_id.clone(),
            )
            .with_message(format!(
                "{} helpers paired, threshold is {}",
                state.paired, self.threshold
            ))
            .with_severity(Severity::Warning)
        };
        self.bus.emit(notification);
    }
}
