use custodia_types::{Operation, PairingStatus, SecretId};
use std::path::PathBuf;
use thiserror::Error;

/// Errors generated by the sharing core.
///
/// Only structural misuse is returned to callers; failures of
/// individual deliveries and pairing attempts are folded into
/// the quorum and surfaced as notifications.
#[derive(Debug, Error)]
pub enum Error {
    /// Error generated when a helper is already on the roster
    /// of a secret.
    #[error("helper '{0}' is already on the roster")]
    DuplicateHelper(String),

    /// Error generated when a secret identifier is already
    /// registered with a sharer.
    #[error("secret {0} already exists")]
    DuplicateSecret(SecretId),

    /// Error generated when operating on a closed secret.
    #[error("secret {0} is closed")]
    SecretClosed(SecretId),

    /// Error generated when creating a secret on a closed sharer.
    #[error("sharer '{0}' is closed")]
    SharerClosed(String),

    /// Error generated when fewer helpers are paired than the
    /// recovery threshold.
    #[error("{paired} helpers paired, recovery threshold is {threshold}")]
    InsufficientHelpers {
        /// Number of paired helpers.
        paired: usize,
        /// Recovery threshold of the secret.
        threshold: usize,
    },

    /// Error generated when an operation is not valid for the
    /// current pairing status of a helper.
    #[error("cannot {operation} helper '{helper}' in status {status}")]
    InvalidStateTransition {
        /// Helper name.
        helper: String,
        /// Operation that was attempted.
        operation: Operation,
        /// Status of the helper.
        status: PairingStatus,
    },

    /// Error generated when a threshold is out of range.
    #[error("invalid threshold {0}")]
    InvalidThreshold(usize),

    /// Error generated when a version does not exist or has not
    /// been protected.
    #[error("version {0} not found")]
    VersionNotFound(u64),

    /// Error generated when not enough fragments could be
    /// retrieved to recover a version.
    #[error("recovered {have} fragments of version {version}, need {need}")]
    RecoveryFailed {
        /// Version being recovered.
        version: u64,
        /// Fragments retrieved.
        have: usize,
        /// Recovery threshold.
        need: usize,
    },

    /// Error generated when a helper refuses a request.
    #[error("helper refused: {0}")]
    HelperRefused(String),

    /// Error generated when a request is canceled before the
    /// helper replies.
    #[error("request canceled ({0:?})")]
    RequestCanceled(custodia_wire::CancelReason),

    /// Error generated when a notification dispatcher is
    /// created outside of a tokio runtime.
    #[error("notifications require a tokio runtime")]
    NoRuntime,

    /// Error generated when a configuration file does not exist.
    #[error("path {0} is not a file")]
    NotFile(PathBuf),

    /// Errors generated by the wire protocol.
    #[error(transparent)]
    Wire(#[from] custodia_wire::Error),

    /// Errors generated by the fragment provider.
    #[error(transparent)]
    Fragments(#[from] custodia_fragments::Error),

    /// Errors generated by the core types.
    #[error(transparent)]
    Types(#[from] custodia_types::Error),

    /// Errors generated by the IO module.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Errors generated parsing TOML.
    #[error(transparent)]
    TomlDeser(#[from] toml::de::Error),

    /// Errors generated serializing TOML.
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}
