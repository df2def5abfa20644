//! Failed-login lockout decisions. Pure functions over the account's counters.

use chrono::{DateTime, Duration, Utc};

use super::account::Account;

/// Outcome of recording one failed password attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Below the threshold; `attempts_remaining` more failures trigger a lock.
    Counted {
        attempts: u32,
        attempts_remaining: u32,
    },
    /// Threshold reached; the account is locked until `until`.
    Locked { attempts: u32, until: DateTime<Utc> },
}

impl FailureOutcome {
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Counted { attempts, .. } | Self::Locked { attempts, .. } => *attempts,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockoutPolicy {
    max_attempts: u32,
    lock_duration: Duration,
}

impl LockoutPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, lock_seconds: i64) -> Self {
        Self {
            max_attempts,
            lock_duration: Duration::seconds(lock_seconds),
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Lock length in whole minutes, rounded up, for user-facing messages.
    #[must_use]
    pub fn lock_minutes(&self) -> i64 {
        ceil_minutes(self.lock_duration)
    }

    #[must_use]
    pub fn is_locked(&self, account: &Account, now: DateTime<Utc>) -> bool {
        account.account_locked_until.is_some_and(|until| until > now)
    }

    /// Minutes until the lock lifts, rounded up; zero when not locked.
    #[must_use]
    pub fn remaining_minutes(&self, account: &Account, now: DateTime<Utc>) -> i64 {
        account
            .account_locked_until
            .filter(|until| *until > now)
            .map_or(0, |until| ceil_minutes(until - now))
    }

    /// The counter is not reset when a lock expires, so an account that was
    /// locked before locks again on its next failure.
    #[must_use]
    pub fn register_failure(&self, account: &Account, now: DateTime<Utc>) -> FailureOutcome {
        let attempts = account.failed_login_attempts.saturating_add(1);
        if attempts >= self.max_attempts {
            FailureOutcome::Locked {
                attempts,
                until: now + self.lock_duration,
            }
        } else {
            FailureOutcome::Counted {
                attempts,
                attempts_remaining: self.max_attempts - attempts,
            }
        }
    }
}

fn ceil_minutes(span: Duration) -> i64 {
    let whole = span.num_minutes().max(0);
    if span > Duration::minutes(whole) {
        whole + 1
    } else {
        whole
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::account::fixtures;

    fn policy() -> LockoutPolicy {
        LockoutPolicy::new(5, 600)
    }

    #[test]
    fn counts_down_then_locks() {
        let policy = policy();
        let now = Utc::now();
        let mut account = fixtures::account("ada", "ada@example.com");

        for expected_remaining in (1..=4).rev() {
            match policy.register_failure(&account, now) {
                FailureOutcome::Counted {
                    attempts,
                    attempts_remaining,
                } => {
                    assert_eq!(attempts_remaining, expected_remaining);
                    account.failed_login_attempts = attempts;
                }
                FailureOutcome::Locked { .. } => panic!("locked too early"),
            }
        }

        let outcome = policy.register_failure(&account, now);
        assert_eq!(
            outcome,
            FailureOutcome::Locked {
                attempts: 5,
                until: now + Duration::minutes(10)
            }
        );
    }

    #[test]
    fn lock_window_is_exclusive_at_the_end() {
        let policy = policy();
        let now = Utc::now();
        let mut account = fixtures::account("ada", "ada@example.com");
        account.account_locked_until = Some(now + Duration::minutes(10));

        assert!(policy.is_locked(&account, now));
        assert!(policy.is_locked(&account, now + Duration::minutes(9)));
        assert!(!policy.is_locked(&account, now + Duration::minutes(10)));
        assert!(!policy.is_locked(&account, now + Duration::minutes(11)));
    }

    #[test]
    fn remaining_minutes_rounds_up() {
        let policy = policy();
        let now = Utc::now();
        let mut account = fixtures::account("ada", "ada@example.com");
        assert_eq!(policy.remaining_minutes(&account, now), 0);

        account.account_locked_until = Some(now + Duration::seconds(61));
        assert_eq!(policy.remaining_minutes(&account, now), 2);

        account.account_locked_until = Some(now + Duration::seconds(600));
        assert_eq!(policy.remaining_minutes(&account, now), 10);

        account.account_locked_until = Some(now + Duration::milliseconds(500));
        assert!(policy.is_locked(&account, now));
        assert_eq!(policy.remaining_minutes(&account, now), 1);

        account.account_locked_until = Some(now + Duration::milliseconds(60_500));
        assert_eq!(policy.remaining_minutes(&account, now), 2);

        account.account_locked_until = Some(now + Duration::milliseconds(540_300));
        assert_eq!(policy.remaining_minutes(&account, now), 10);

        account.account_locked_until = Some(now - Duration::seconds(1));
        assert_eq!(policy.remaining_minutes(&account, now), 0);
        assert_eq!(policy.lock_minutes(), 10);
    }

    #[test]
    fn expired_lock_relocks_on_next_failure() {
        let policy = policy();
        let now = Utc::now();
        let mut account = fixtures::account("ada", "ada@example.com");
        account.failed_login_attempts = 5;
        account.account_locked_until = Some(now - Duration::minutes(1));

        assert!(!policy.is_locked(&account, now));
        assert!(matches!(
            policy.register_failure(&account, now),
            FailureOutcome::Locked { attempts: 6, .. }
        ));
    }
}
