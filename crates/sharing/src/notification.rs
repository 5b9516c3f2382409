//! Notifications describing lifecycle events of secrets.
//!
//! Notifications are queued in the order the underlying state
//! transitions happen and delivered to a single application
//! listener by a dispatcher task.
use crate::{Error, Result};
use custodia_types::{HelperIdentity, SecretId, UtcDateTime};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};
use tokio::sync::{broadcast, mpsc};

/// Kind of notification.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    /// Helper accepted a pairing.
    HelperPaired,
    /// Helper refused a pairing.
    HelperRefused,
    /// Pairing attempt failed or a request to a paired helper
    /// failed at the transport level.
    HelperFailed,
    /// Helper confirmed removal of the pairing.
    HelperUnpaired,
    /// Unpair request failed after exhausting retries.
    UnpairFailed,
    /// Helper disconnected on its own initiative.
    HelperGone,
    /// One delivery of a version completed.
    UpdateProgress,
    /// Version reached the recovery threshold.
    UpdateAvailable,
    /// Version can no longer reach the recovery threshold.
    UpdateFailed,
    /// Every delivery of a version replied.
    UpdateComplete,
    /// Version was superseded before it resolved.
    UpdateCanceled,
    /// One verification of a fragment completed.
    VerifyProgress,
    /// Helper failed a verification.
    HelperUnhealthy,
    /// Secret became recoverable from paired helpers.
    SecretAvailable,
    /// Secret is no longer recoverable from paired helpers.
    SecretUnavailable,
    /// Secret was closed.
    SecretClosed,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Severity of a notification.
#[derive(
    Debug, Default, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    /// Informational.
    #[default]
    Info,
    /// Degraded but recoverable.
    Warning,
    /// Operation failed.
    Error,
}

/// Lifecycle event of a secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    kind: NotificationKind,
    secret_id: SecretId,
    version: Option<u64>,
    helper: Option<HelperIdentity>,
    message: String,
    severity: Severity,
    timestamp: UtcDateTime,
}

impl Notification {
    /// Create a notification for a secret.
    pub fn new(kind: NotificationKind, secret_id: SecretId) -> Self {
        Self {
            kind,
            secret_id,
            version: None,
            helper: None,
            message: String::new(),
            severity: Severity::Info,
            timestamp: UtcDateTime::now(),
        }
    }

    /// Set the version.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    /// Set the helper.
    pub fn with_helper(mut self, helper: HelperIdentity) -> Self {
        self.helper = Some(helper);
        self
    }

    /// Set the message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Kind of notification.
    pub fn kind(&self) -> NotificationKind {
        self.kind
    }

    /// Secret the notification is about.
    pub fn secret_id(&self) -> &SecretId {
        &self.secret_id
    }

    /// Version the notification is about.
    pub fn version(&self) -> Option<u64> {
        self.version
    }

    /// Helper the notification is about.
    pub fn helper(&self) -> Option<&HelperIdentity> {
        self.helper.as_ref()
    }

    /// Message describing the event.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Severity of the event.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// When the event happened.
    pub fn timestamp(&self) -> &UtcDateTime {
        &self.timestamp
    }
}

/// Receives notifications.
///
/// Compose multiple listeners by chaining them in one
/// implementation.
pub trait NotificationListener: Send + Sync + 'static {
    /// Handle a notification.
    fn notify(&self, notification: &Notification);
}

impl<F> NotificationListener for F
where
    F: Fn(&Notification) + Send + Sync + 'static,
{
    fn notify(&self, notification: &Notification) {
        self(notification)
    }
}

/// Listener that forwards notifications to a broadcast channel.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: broadcast::Sender<Notification>,
}

impl ChannelListener {
    /// Create a channel listener with a buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

impl NotificationListener for ChannelListener {
    fn notify(&self, notification: &Notification) {
        // No receivers is not an error
        let _ = self.tx.send(notification.clone());
    }
}

/// Ordered queue of notifications drained by a dispatcher task.
#[derive(Clone)]
pub(crate) struct NotificationBus {
    tx: mpsc::UnboundedSender<Notification>,
}

impl NotificationBus {
    /// Spawn a dispatcher delivering to the listener.
    ///
    /// The dispatcher exits once every bus handle is dropped.
    pub fn spawn(listener: Arc<dyn NotificationListener>) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| Error::NoRuntime)?;
        let (tx, mut rx) = mpsc::unbounded_channel::<Notification>();
        runtime.spawn(async move {
            while let Some(notification) = rx.recv().await {
                dispatch(listener.as_ref(), &notification);
            }
            tracing::debug!("notifications::dispatcher_exit");
        });
        Ok(Self { tx })
    }

    /// Queue a notification.
    pub fn emit(&self, notification: Notification) {
        match notification.severity {
            Severity::Info => tracing::debug!(
                kind = %notification.kind,
                secret_id = %notification.secret_id,
                version = ?notification.version,
                helper = ?notification.helper.as_ref().map(|h| h.name()),
                "notify",
            ),
            Severity::Warning | Severity::Error => tracing::warn!(
                kind = %notification.kind,
                secret_id = %notification.secret_id,
                version = ?notification.version,
                helper = ?notification.helper.as_ref().map(|h| h.name()),
                message = %notification.message,
                "notify",
            ),
        }
        if self.tx.send(notification).is_err() {
            tracing::warn!("notifications::dispatcher_closed");
        }
    }
}

impl fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationBus").finish_non_exhaustive()
    }
}

/// Invoke a listener, isolating any panic.
fn dispatch(listener: &dyn NotificationListener, notification: &Notification) {
    let result =
        catch_unwind(AssertUnwindSafe(|| listener.notify(notification)));
    if result.is_err() {
        tracing::error!(
            kind = %notification.kind,
            secret_id = %notification.secret_id,
            "notifications::listener_panicked",
        );
    }
}
