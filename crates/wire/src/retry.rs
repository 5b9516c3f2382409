//! Bounded exponential backoff for requests that must eventually land.
use crate::{CancelReason, Error, Result};
use std::time::Duration;
use tokio::sync::watch;

/// Retry budget and backoff for a request that is repeated
/// until the helper answers.
///
/// Attempts are numbered from one; the delay before the attempt
/// that follows attempt `n` is `reconnect_interval * 2^n`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct NetworkRetry {
    /// Base retry interval in milliseconds.
    pub reconnect_interval: u16,
    /// Maximum number of retries after the first attempt.
    pub maximum_retries: u32,
}

impl Default for NetworkRetry {
    fn default() -> Self {
        Self::new(4, 1000)
    }
}

impl NetworkRetry {
    /// Create a retry budget.
    ///
    /// The reconnect interval is a *base interval* in milliseconds
    /// so use a small value such as `1000` or `2000`.
    pub fn new(maximum_retries: u32, reconnect_interval: u16) -> Self {
        Self {
            reconnect_interval,
            maximum_retries,
        }
    }

    /// Backoff delay after a failed attempt.
    pub fn delay(&self, attempt: u32) -> Result<Duration> {
        let millis = 2u64
            .checked_pow(attempt)
            .and_then(|factor| {
                factor.checked_mul(self.reconnect_interval as u64)
            })
            .ok_or(Error::RetryOverflow)?;
        Ok(Duration::from_millis(millis))
    }

    /// Whether no retry may follow a failed attempt.
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        attempt > self.maximum_retries
    }

    /// Sleep for the backoff delay after a failed attempt.
    ///
    /// Returns [Error::RetryCanceled] if the cancel channel
    /// changes before the delay elapses.
    pub async fn backoff(
        &self,
        attempt: u32,
        mut cancel: watch::Receiver<CancelReason>,
    ) -> Result<()> {
        let delay = self.delay(attempt)?;
        tracing::debug!(
            attempt = %attempt,
            delay = ?delay,
            maximum_retries = %self.maximum_retries,
            "retry::backoff",
        );

        tokio::select! {
            _ = cancel.changed() => {
                let reason = *cancel.borrow();
                Err(Error::RetryCanceled(reason))
            }
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}
