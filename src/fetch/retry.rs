//! Bounded retry with a fixed delay for document downloads.
//!
//! The delay is slept between attempts only: three attempts wait twice, and a
//! final failure returns without sleeping.
//!
//! The decision is a pure function of the attempt number and the attempt's
//! result, independent of the HTTP mechanism:
//!
//! ```
//! use std::time::Duration;
//! use paper_harvester::fetch::{FetchError, RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::new(3, Duration::from_secs(5));
//! let failed: Result<(), FetchError> = Err(FetchError::http_status("https://arxiv.org/pdf/x", 503));
//!
//! assert!(matches!(policy.decide(1, &failed), RetryDecision::Retry { next_attempt: 2, .. }));
//! assert!(matches!(policy.decide(3, &failed), RetryDecision::GiveUp { .. }));
//! assert_eq!(policy.decide(1, &Ok::<(), FetchError>(())), RetryDecision::Success);
//! ```

use std::time::Duration;

use tracing::debug;

use super::FetchError;

/// Default maximum attempts per document (including the first).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Default whole-request timeout for one download attempt.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Classification of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Timeout, network failure or any non-success status: worth another try.
    Transient,

    /// The request can never succeed (malformed URL).
    Permanent,

    /// Local storage failed; the run has to stop.
    LocalStorage,
}

/// Outcome of evaluating one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// The attempt succeeded.
    Success,

    /// Try again after `delay`.
    Retry {
        /// How long to wait before the next attempt.
        delay: Duration,
        /// 1-indexed number of the next attempt.
        next_attempt: u32,
    },

    /// Stop trying.
    GiveUp {
        /// Human-readable reason.
        reason: String,
    },
}

/// Fixed-delay retry budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Maximum number of attempts, including the first.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay inserted between attempts.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Decides what follows attempt number `attempt` (1-indexed) given its result.
    pub fn decide<T>(&self, attempt: u32, result: &Result<T, FetchError>) -> RetryDecision {
        match result {
            Ok(_) => RetryDecision::Success,
            Err(error) => self.should_retry(classify_error(error), attempt),
        }
    }

    /// Decides whether a failure of the given type on `attempt` is retried.
    #[must_use]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        match failure_type {
            FailureType::Permanent => {
                return RetryDecision::GiveUp {
                    reason: "permanent failure - retry would not help".to_string(),
                };
            }
            FailureType::LocalStorage => {
                return RetryDecision::GiveUp {
                    reason: "local storage failure".to_string(),
                };
            }
            FailureType::Transient => {}
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::GiveUp {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        RetryDecision::Retry {
            delay: self.delay,
            next_attempt: attempt + 1,
        }
    }
}

/// Classifies a fetch error for retry decisions.
///
/// Every non-success HTTP status is transient, 4xx included.
#[must_use]
pub fn classify_error(error: &FetchError) -> FailureType {
    match error {
        FetchError::Network { .. }
        | FetchError::Timeout { .. }
        | FetchError::HttpStatus { .. }
        | FetchError::RetriesExhausted { .. } => FailureType::Transient,
        FetchError::InvalidUrl { .. } | FetchError::Client { .. } => FailureType::Permanent,
        FetchError::Io { .. } => FailureType::LocalStorage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http_failure(status: u16) -> Result<(), FetchError> {
        Err(FetchError::http_status("https://example.com/x.pdf", status))
    }

    #[test]
    fn test_retry_policy_default_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_retry_policy_max_attempts_minimum_is_one() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.max_attempts(), 1);
        assert!(matches!(
            policy.decide(1, &http_failure(500)),
            RetryDecision::GiveUp { .. }
        ));
    }

    #[test]
    fn test_decide_success_on_ok() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.decide(3, &Ok::<u8, FetchError>(1)), RetryDecision::Success);
    }

    #[test]
    fn test_decide_retries_any_status_until_budget_spent() {
        let policy = RetryPolicy::new(3, Duration::from_secs(5));
        for status in [403, 404, 429, 500, 503] {
            assert_eq!(
                policy.decide(1, &http_failure(status)),
                RetryDecision::Retry {
                    delay: Duration::from_secs(5),
                    next_attempt: 2
                },
                "status {status} should be retried"
            );
        }
        assert!(matches!(
            policy.decide(2, &http_failure(500)),
            RetryDecision::Retry { next_attempt: 3, .. }
        ));
        match policy.decide(3, &http_failure(500)) {
            RetryDecision::GiveUp { reason } => assert!(reason.contains("exhausted")),
            other => panic!("expected GiveUp, got {other:?}"),
        }
    }

    #[test]
    fn test_decide_delay_is_fixed() {
        let policy = RetryPolicy::new(5, Duration::from_millis(250));
        let delays: Vec<Duration> = (1..5)
            .filter_map(|attempt| match policy.decide(attempt, &http_failure(502)) {
                RetryDecision::Retry { delay, .. } => Some(delay),
                _ => None,
            })
            .collect();
        assert_eq!(delays, vec![Duration::from_millis(250); 4]);
    }

    #[test]
    fn test_decide_timeout_is_transient() {
        let policy = RetryPolicy::default();
        let result: Result<(), FetchError> = Err(FetchError::timeout("https://example.com"));
        assert!(matches!(policy.decide(1, &result), RetryDecision::Retry { .. }));
    }

    #[test]
    fn test_decide_invalid_url_gives_up_immediately() {
        let policy = RetryPolicy::default();
        let result: Result<(), FetchError> = Err(FetchError::invalid_url("nope"));
        match policy.decide(1, &result) {
            RetryDecision::GiveUp { reason } => assert!(reason.contains("permanent")),
            other => panic!("expected GiveUp, got {other:?}"),
        }
    }

    #[test]
    fn test_decide_io_failure_is_not_retried() {
        let policy = RetryPolicy::default();
        let io = std::io::Error::other("disk full");
        let result: Result<(), FetchError> = Err(FetchError::io("/cache/x.pdf", io));
        assert_eq!(classify_error(result.as_ref().unwrap_err()), FailureType::LocalStorage);
        assert!(matches!(policy.decide(1, &result), RetryDecision::GiveUp { .. }));
    }
}
