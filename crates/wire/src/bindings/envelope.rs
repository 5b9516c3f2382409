use super::wire::{WireResult, WireResultStatus};
use crate::{Error, Result};
use std::fmt;

/// Application level status carried by every response.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum ResultStatus {
    /// Request was handled.
    Ok,
    /// Helper declined the request.
    Refused,
    /// Helper holds nothing matching the request.
    NotFound,
    /// Helper no longer takes part in the pairing.
    Gone,
    /// Helper failed to handle the request.
    Error,
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Ok => "ok",
                Self::Refused => "refused",
                Self::NotFound => "not_found",
                Self::Gone => "gone",
                Self::Error => "error",
            }
        )
    }
}

impl TryFrom<i32> for ResultStatus {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        let status = WireResultStatus::try_from(value).map_err(|_| {
            Error::MalformedResponse(format!("unknown result status {value}"))
        })?;
        Ok(match status {
            WireResultStatus::Unspecified => {
                return Err(Error::MalformedResponse(
                    "result status is unspecified".to_owned(),
                ))
            }
            WireResultStatus::Ok => Self::Ok,
            WireResultStatus::Refused => Self::Refused,
            WireResultStatus::NotFound => Self::NotFound,
            WireResultStatus::Gone => Self::Gone,
            WireResultStatus::Error => Self::Error,
        })
    }
}

impl From<ResultStatus> for WireResultStatus {
    fn from(value: ResultStatus) -> Self {
        match value {
            ResultStatus::Ok => Self::Ok,
            ResultStatus::Refused => Self::Refused,
            ResultStatus::NotFound => Self::NotFound,
            ResultStatus::Gone => Self::Gone,
            ResultStatus::Error => Self::Error,
        }
    }
}

/// Result envelope wrapping every response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEnvelope {
    /// Status of the response.
    pub status: ResultStatus,
    /// Human readable memo from the helper.
    pub memo: String,
}

impl ResultEnvelope {
    /// Envelope for a handled request.
    pub fn ok() -> Self {
        Self {
            status: ResultStatus::Ok,
            memo: String::new(),
        }
    }

    /// Envelope with a status and memo.
    pub fn new(status: ResultStatus, memo: impl Into<String>) -> Self {
        Self {
            status,
            memo: memo.into(),
        }
    }

    /// Whether the status is [ResultStatus::Ok].
    pub fn is_ok(&self) -> bool {
        matches!(self.status, ResultStatus::Ok)
    }
}

impl TryFrom<Option<WireResult>> for ResultEnvelope {
    type Error = Error;

    fn try_from(value: Option<WireResult>) -> Result<Self> {
        let value = value.ok_or_else(|| {
            Error::MalformedResponse("missing result envelope".to_owned())
        })?;
        Ok(Self {
            status: value.status.try_into()?,
            memo: value.memo,
        })
    }
}

impl From<ResultEnvelope> for WireResult {
    fn from(value: ResultEnvelope) -> Self {
        Self {
            status: WireResultStatus::from(value.status) as i32,
            memo: value.memo,
        }
    }
}
