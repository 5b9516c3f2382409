#![deny(missing_docs)]
#![forbid(unsafe_code)]
//! Quorum orchestration for secrets split across remote helpers.
//!
//! A [Sharer] owns a registry of [Secret]s. Each secret pairs
//! with a roster of helpers and publishes [Version]s; every
//! version is split into one fragment per paired helper and
//! resolves once the recovery threshold of helpers acknowledge
//! their fragment or once the threshold can no longer be met.
//!
//! Lifecycle events are delivered to a [NotificationListener].

mod availability;
mod client;
mod context;
mod error;
mod notification;
mod policy;
mod secret;
mod settings;
mod share;
mod sharer;
mod version;

pub use client::{HelperClient, HelperHandle, VerifyEntry};
pub use context::Services;
pub use error::Error;
pub use notification::{
    ChannelListener, Notification, NotificationKind, NotificationListener,
    Severity,
};
pub use policy::{ResponseOutcome, ResponsePolicy};
pub use secret::{CloseHandle, CloseOutcome, Secret, VerifyReport};
pub use settings::{RetryConfig, SecretOptions, SharerConfig, SharingSettings};
pub use share::{DeliveryState, Share};
pub use sharer::Sharer;
pub use version::{Version, VersionOutcome, VersionState};

pub use custodia_types::{HelperIdentity, Operation, PairingStatus, SecretId};

/// Result type for the sharing core.
pub type Result<T> = std::result::Result<T, Error>;
