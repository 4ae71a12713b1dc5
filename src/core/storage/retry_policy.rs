// Retry rules for logical storage operations.
//
// A "logical operation" is everything inside one transaction: when it fails with a
// transient conflict we roll back and run the WHOLE unit again, because none of its
// earlier statements are durable yet. This file only decides *whether* to retry; the
// infra layer owns the actual loop around the database driver.

/// How a failed attempt should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Optimistic-concurrency signal (busy/locked/serialization failure).
    TransientConflict,
    /// The connection itself broke (I/O, TLS, pool timeout).
    Connection,
    /// Anything else: bad SQL, constraint violations, decode errors.
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    GiveUp,
}

/// Bounds for the retry wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed when the store keeps reporting conflicts.
    pub max_attempts: u32,
    /// How many times a broken connection may be retried on a fresh one.
    pub reconnect_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            reconnect_retries: 1,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }
}

/// Per-operation bookkeeping. Create one for each logical operation.
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    attempts: u32,
    reconnects: u32,
}

impl RetryState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
            reconnects: 0,
        }
    }

    /// Number of attempts that have failed so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Record a failed attempt and decide what happens next.
    pub fn record_failure(&mut self, class: FailureClass) -> RetryDecision {
        self.attempts += 1;

        match class {
            FailureClass::TransientConflict if self.attempts < self.policy.max_attempts => {
                RetryDecision::Retry
            }
            FailureClass::Connection if self.reconnects < self.policy.reconnect_retries => {
                self.reconnects += 1;
                RetryDecision::Retry
            }
            _ => RetryDecision::GiveUp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_get_three_attempts_in_total() {
        let mut state = RetryState::new(RetryPolicy::default());

        assert_eq!(
            state.record_failure(FailureClass::TransientConflict),
            RetryDecision::Retry
        );
        assert_eq!(
            state.record_failure(FailureClass::TransientConflict),
            RetryDecision::Retry
        );
        assert_eq!(
            state.record_failure(FailureClass::TransientConflict),
            RetryDecision::GiveUp
        );
        assert_eq!(state.attempts(), 3);
    }

    #[test]
    fn broken_connections_are_retried_once() {
        let mut state = RetryState::new(RetryPolicy::default());

        assert_eq!(
            state.record_failure(FailureClass::Connection),
            RetryDecision::Retry
        );
        assert_eq!(
            state.record_failure(FailureClass::Connection),
            RetryDecision::GiveUp
        );
    }

    #[test]
    fn fatal_errors_are_never_retried() {
        let mut state = RetryState::new(RetryPolicy::default());
        assert_eq!(state.record_failure(FailureClass::Fatal), RetryDecision::GiveUp);
        assert_eq!(state.attempts(), 1);
    }

    #[test]
    fn reconnect_does_not_extend_the_conflict_budget() {
        let mut state = RetryState::new(RetryPolicy::default());

        assert_eq!(
            state.record_failure(FailureClass::Connection),
            RetryDecision::Retry
        );
        assert_eq!(
            state.record_failure(FailureClass::TransientConflict),
            RetryDecision::Retry
        );
        // Third failed attempt overall: the conflict bound is reached.
        assert_eq!(
            state.record_failure(FailureClass::TransientConflict),
            RetryDecision::GiveUp
        );
    }

    #[test]
    fn max_attempts_is_at_least_one() {
        let mut state = RetryState::new(RetryPolicy::with_max_attempts(0));
        assert_eq!(
            state.record_failure(FailureClass::TransientConflict),
            RetryDecision::GiveUp
        );
    }
}
