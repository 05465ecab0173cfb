//! Retry with linear backoff for volatile aggregator calls.
//!
//! Every failure is sorted three ways by its upstream code:
//! unsupported (neutral empty result), retryable (sleep and try again),
//! or fatal.

use budgetsync_ingest::UpstreamError;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::SyncError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

const TRANSACTIONS_RETRYABLE: &[&str] =
    &["PRODUCT_NOT_READY", "TRANSACTIONS_SYNC_MUTATION_DURING_PAGINATION"];

const INVESTMENTS_UNSUPPORTED: &[&str] = &[
    "INVALID_PRODUCT",
    "PRODUCTS_NOT_SUPPORTED",
    "NO_INVESTMENT_ACCOUNTS",
    "NO_LIABILITY_ACCOUNTS",
    "PRODUCT_NOT_READY",
];

const LIABILITIES_UNSUPPORTED: &[&str] = &[
    "INVALID_PRODUCT",
    "PRODUCTS_NOT_SUPPORTED",
    "NO_LIABILITY_ACCOUNTS",
    "PRODUCT_NOT_READY",
];

/// How one call site reacts to upstream error codes
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Call-site name for logs and errors
    pub call: &'static str,
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub retryable: &'static [&'static str],
    pub unsupported: &'static [&'static str],
}

/// Which way a failure was sorted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Unsupported,
    Retryable,
    Fatal,
}

impl RetryPolicy {
    pub fn transactions() -> Self {
        Self {
            call: "transactions",
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            retryable: TRANSACTIONS_RETRYABLE,
            unsupported: &[],
        }
    }

    pub fn investments() -> Self {
        Self {
            call: "investment holdings",
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            retryable: &[],
            unsupported: INVESTMENTS_UNSUPPORTED,
        }
    }

    pub fn liabilities() -> Self {
        Self {
            call: "liabilities",
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            retryable: &[],
            unsupported: LIABILITIES_UNSUPPORTED,
        }
    }

    pub fn with_timing(mut self, max_attempts: u32, base_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.base_delay = base_delay;
        self
    }

    pub fn is_unsupported(&self, code: &str) -> bool {
        self.unsupported.contains(&code)
    }

    pub fn is_retryable(&self, code: &str) -> bool {
        self.retryable.contains(&code)
    }

    /// Unsupported is checked first, so a code listed in both sets degrades
    /// instead of retrying. Errors without a code are always fatal.
    pub fn disposition(&self, err: &UpstreamError) -> Disposition {
        match err.code() {
            Some(code) if self.is_unsupported(code) => Disposition::Unsupported,
            Some(code) if self.is_retryable(code) => Disposition::Retryable,
            _ => Disposition::Fatal,
        }
    }

    /// Backoff before the attempt following `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// Run `op` under `policy`.
///
/// Unsupported-product failures return `T::default()` right away. Retryable
/// failures sleep `attempt * base_delay` and try again, up to
/// `max_attempts` calls in total. Anything else, or running out of
/// attempts, is a fatal [`SyncError::Upstream`].
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, SyncError>
where
    T: Default,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        match policy.disposition(&err) {
            Disposition::Unsupported => {
                info!(call = policy.call, code = ?err.code(), "product unsupported for item; using empty result");
                return Ok(T::default());
            }
            Disposition::Retryable if attempt < max_attempts => {
                let delay = policy.delay_after(attempt);
                warn!(
                    call = policy.call,
                    code = ?err.code(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "upstream not ready; retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            _ => {
                return Err(SyncError::Upstream {
                    call: policy.call,
                    attempts: attempt,
                    source: err,
                });
            }
        }
    }
}
