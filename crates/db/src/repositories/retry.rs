//! Lock and retry settings for stock-changing units of work.

use std::fmt::Display;
use std::time::Duration;

use torque_core::inventory::InventoryError;
use torque_shared::StockConfig;

use super::error::TransactionError;

/// How long a unit of work waits for row locks, and how often it retries.
///
/// # Default Values
///
/// - `lock_timeout`: 2 seconds
/// - `max_attempts`: 3
/// - `backoff`: 50ms (attempt `n` waits `n * backoff` before the next one)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Longest wait for a single product row lock.
    pub lock_timeout: Duration,
    /// Attempts before contention is reported as `ConcurrentModification`.
    pub max_attempts: u32,
    /// Base delay of the linear backoff between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        StockConfig::default().into()
    }
}

impl From<StockConfig> for RetryPolicy {
    fn from(config: StockConfig) -> Self {
        Self {
            lock_timeout: Duration::from_millis(config.lock_timeout_ms),
            max_attempts: config.max_attempts,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

impl RetryPolicy {
    /// Returns the number of attempts to make; always at least one.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Returns the delay to wait after the given failed attempt (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }

    /// Runs `attempt` until it stops losing lock races or the budget is spent.
    ///
    /// Each call to `attempt` must run a whole unit of work of its own, so a
    /// failed attempt leaves nothing behind.
    ///
    /// # Errors
    ///
    /// Returns the first non-contention failure, or `ConcurrentModification`
    /// once every attempt has hit lock contention.
    pub async fn run<T, F, Fut>(
        &self,
        operation: impl Display,
        mut attempt: F,
    ) -> Result<T, TransactionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransactionError>>,
    {
        let max_attempts = self.attempts();
        let mut made = 1;

        loop {
            match attempt().await {
                Err(TransactionError::Contention { product_id, source }) => {
                    if made >= max_attempts {
                        tracing::warn!(
                            %operation,
                            attempts = made,
                            product_id = ?product_id,
                            error = %source,
                            "Giving up after repeated lock contention"
                        );
                        return Err(InventoryError::ConcurrentModification {
                            product_id,
                            attempts: made,
                        }
                        .into());
                    }

                    let delay = self.delay_after(made);
                    tracing::warn!(
                        %operation,
                        attempt = made,
                        product_id = ?product_id,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %source,
                        "Lock contention, retrying unit of work"
                    );
                    tokio::time::sleep(delay).await;
                    made += 1;
                }
                outcome => return outcome,
            }
        }
    }
}
