//! Bounded retry policy.
//!
//! Flaky collaborator calls are wrapped in a policy object injected at the
//! call site rather than ad hoc loops inside the state machine. The policy
//! only describes the schedule; executing it belongs to the caller.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A bounded exponential backoff schedule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,

    /// Delay before the second attempt, in milliseconds.
    pub base_delay_ms: u64,

    /// Backoff multiplier applied per subsequent attempt.
    pub multiplier: u32,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            multiplier: 1,
        }
    }

    /// Delay to wait after a failed attempt (0-based), or None when the
    /// attempt budget is exhausted.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt + 1 >= self.max_attempts {
            return None;
        }
        let factor = self.multiplier.saturating_pow(attempt);
        Some(Duration::from_millis(
            self.base_delay_ms.saturating_mul(u64::from(factor)),
        ))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            multiplier: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_delay_ms: 100,
            multiplier: 2,
        };
        assert_eq!(policy.delay_after(0), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_after(1), Some(Duration::from_millis(200)));
        assert_eq!(policy.delay_after(2), Some(Duration::from_millis(400)));
        assert_eq!(policy.delay_after(3), None);
    }

    #[test]
    fn test_none_policy_exhausts_immediately() {
        assert_eq!(RetryPolicy::none().delay_after(0), None);
    }
}
