use serde::{Deserialize, Serialize};
use std::fmt;

/// Pairing status of the link between a secret and a helper.
///
/// ```text
/// None -> Invited -> { Paired | Refused }
/// Paired -> PendingRemoval -> { Removed | Failed }
/// any in-flight transport failure -> Failed
/// helper-initiated disconnect -> Gone
/// ```
#[derive(
    Debug, Default, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum PairingStatus {
    /// Link created, no pairing attempted yet.
    #[default]
    None,
    /// Pair request sent, waiting for the helper.
    Invited,
    /// Helper accepted the pairing.
    Paired,
    /// Helper refused the pairing.
    Refused,
    /// Unpair request sent, waiting for the helper.
    PendingRemoval,
    /// Helper confirmed the removal.
    Removed,
    /// Request failed or timed out.
    Failed,
    /// Helper disconnected on its own initiative.
    Gone,
}

impl PairingStatus {
    /// Whether `pair()` may be called from this status.
    pub fn can_pair(&self) -> bool {
        matches!(self, Self::None | Self::Failed)
    }

    /// Whether the helper accepts fragments in this status.
    pub fn is_paired(&self) -> bool {
        matches!(self, Self::Paired)
    }

    /// Whether no further transition happens without a new
    /// pairing attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Refused | Self::Removed | Self::Failed | Self::Gone
        )
    }

    /// Whether a request for this link is outstanding.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Invited | Self::PendingRemoval)
    }
}

impl fmt::Display for PairingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::None => "none",
                Self::Invited => "invited",
                Self::Paired => "paired",
                Self::Refused => "refused",
                Self::PendingRemoval => "pending_removal",
                Self::Removed => "removed",
                Self::Failed => "failed",
                Self::Gone => "gone",
            }
        )
    }
}

/// Operations a sharer can request of a helper.
#[derive(
    Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize,
    Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    /// Establish the pairing.
    Pair,
    /// Tear down the pairing.
    Unpair,
    /// Store a fragment of a version.
    Store,
    /// Verify a stored fragment is still held.
    Verify,
    /// Retrieve a stored fragment for recovery.
    Retrieve,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Pair => "pair",
                Self::Unpair => "unpair",
                Self::Store => "store",
                Self::Verify => "verify",
                Self::Retrieve => "retrieve",
            }
        )
    }
}
