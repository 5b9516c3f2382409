use crate::{Operation, UtcDateTime};
use serde::{Deserialize, Serialize};

/// Result of the last request made for a fragment delivery.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    operation: Operation,
    success: bool,
    message: String,
    timestamp: UtcDateTime,
}

impl DeliveryResult {
    /// Successful result for an operation.
    pub fn success(operation: Operation, message: impl Into<String>) -> Self {
        Self {
            operation,
            success: true,
            message: message.into(),
            timestamp: UtcDateTime::now(),
        }
    }

    /// Failed result for an operation.
    pub fn failure(operation: Operation, message: impl Into<String>) -> Self {
        Self {
            operation,
            success: false,
            message: message.into(),
            timestamp: UtcDateTime::now(),
        }
    }

    /// Operation that produced this result.
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Whether the operation succeeded.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Reason or memo returned with the result.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// When the result was recorded.
    pub fn timestamp(&self) -> &UtcDateTime {
        &self.timestamp
    }
}
