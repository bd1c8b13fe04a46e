//! Read Retry Policy
//!
//! The block read stream consults one policy for every transient failure:
//! up to `max_retries` attempts with a fixed delay between them. A
//! successful `GetBlock` or chunk read resets the caller's retry counter,
//! so the budget applies per failure streak rather than per stream
//! lifetime. Errors that can never succeed on retry (security faults,
//! non-retriable storage-container results, corruption) are refused here
//! regardless of the remaining budget.

use std::time::Duration;

use tokio::time::sleep;

use crate::error::ClientError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts per failure streak.
    pub max_retries: u32,

    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Decide whether attempt number `retries` (1-based, already counting
    /// the failure at hand) may retry.
    pub fn should_retry(&self, error: &ClientError, retries: u32) -> bool {
        if retries > self.max_retries {
            return false;
        }
        error.is_retryable()
    }

    pub async fn wait(&self) {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockhouse_proto::datanode::ContainerResult;

    #[test]
    fn test_default_budget() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.delay, Duration::from_secs(1));
    }

    #[test]
    fn test_budget_exhaustion() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let transient = ClientError::RpcTransport("reset".into());
        assert!(policy.should_retry(&transient, 1));
        assert!(policy.should_retry(&transient, 2));
        assert!(policy.should_retry(&transient, 3));
        assert!(!policy.should_retry(&transient, 4));
    }

    #[test]
    fn test_never_retries_security_faults() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        assert!(!policy.should_retry(&ClientError::SecurityFault("expired".into()), 1));
    }

    #[test]
    fn test_never_retries_non_retriable_results() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let err = ClientError::StorageContainer {
            result: ContainerResult::NotRetriable,
            message: "replica dropped".into(),
        };
        assert!(!policy.should_retry(&err, 1));
    }
}
