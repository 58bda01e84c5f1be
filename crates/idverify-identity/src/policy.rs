// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Attempt policy: the pure state machine behind the verification
// controller.
//
// Every submission ends in exactly one of: approved, retry (possibly with
// manual review offered), or a newly imposed lockout. Reaching the lockout
// threshold resets the attempt counter to zero, so the next cycle starts
// fresh once the lock expires.

use chrono::{DateTime, Duration, Utc};
use idverify_core::config::AttemptConfig;
use idverify_core::types::{VerificationAttemptState, VerificationStatus};
use serde::Serialize;

/// Outcome of applying a match result to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transition {
    Approved,
    Retry { attempts: u32, can_manual: bool },
    Locked {
        locked_until: DateTime<Utc>,
        wait_minutes: i64,
    },
}

/// An active lock found before any work was done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveLock {
    pub locked_until: DateTime<Utc>,
    pub wait_minutes: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct AttemptPolicy {
    lockout_threshold: u32,
    lockout_duration: Duration,
    manual_review_threshold: u32,
}

impl Default for AttemptPolicy {
    fn default() -> Self {
        Self::new(&AttemptConfig::default())
    }
}

impl AttemptPolicy {
    pub fn new(config: &AttemptConfig) -> Self {
        Self {
            lockout_threshold: config.lockout_threshold,
            lockout_duration: Duration::minutes(config.lockout_minutes),
            manual_review_threshold: config.manual_review_threshold,
        }
    }

    /// The lock in force at `now`, if any, with the wait rounded up to whole
    /// minutes.
    pub fn evaluate_lock(
        &self,
        state: &VerificationAttemptState,
        now: DateTime<Utc>,
    ) -> Option<ActiveLock> {
        if !state.is_locked_at(now) {
            return None;
        }
        let locked_until = state.locked_until?;
        Some(ActiveLock {
            locked_until,
            wait_minutes: minutes_rounded_up(locked_until - now),
        })
    }

    /// Escalate to manual review: PENDING, documents recorded, counter reset.
    pub fn apply_manual(
        &self,
        state: &VerificationAttemptState,
        documents: serde_json::Value,
        now: DateTime<Utc>,
    ) -> VerificationAttemptState {
        VerificationAttemptState {
            status: VerificationStatus::Pending,
            documents,
            submitted_at: Some(now),
            attempts: 0,
            ..state.clone()
        }
    }

    /// Apply one automated match result.
    pub fn apply_outcome(
        &self,
        state: &VerificationAttemptState,
        matched: bool,
        now: DateTime<Utc>,
    ) -> (VerificationAttemptState, Transition) {
        let mut next = state.clone();

        if matched {
            next.status = VerificationStatus::Approved;
            next.locked_until = None;
            next.attempts = 0;
            return (next, Transition::Approved);
        }

        let attempts = state.attempts.saturating_add(1);
        if attempts >= self.lockout_threshold {
            let locked_until = now + self.lockout_duration;
            next.locked_until = Some(locked_until);
            next.attempts = 0;
            let transition = Transition::Locked {
                locked_until,
                wait_minutes: minutes_rounded_up(self.lockout_duration),
            };
            return (next, transition);
        }

        next.attempts = attempts;
        let transition = Transition::Retry {
            attempts,
            can_manual: attempts >= self.manual_review_threshold,
        };
        (next, transition)
    }

    pub fn lockout_threshold(&self) -> u32 {
        self.lockout_threshold
    }
}

fn minutes_rounded_up(remaining: Duration) -> i64 {
    let millis = remaining.num_milliseconds().max(0);
    (millis + 59_999) / 60_000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(minutes: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap() + Duration::minutes(minutes)
    }

    fn with_attempts(attempts: u32) -> VerificationAttemptState {
        VerificationAttemptState {
            attempts,
            ..Default::default()
        }
    }

    #[test]
    fn sixth_failure_locks_and_resets() {
        let policy = AttemptPolicy::default();
        let (next, transition) = policy.apply_outcome(&with_attempts(5), false, at(0));
        assert_eq!(next.attempts, 0);
        assert_eq!(next.locked_until, Some(at(10)));
        assert_eq!(
            transition,
            Transition::Locked {
                locked_until: at(10),
                wait_minutes: 10
            }
        );
        assert_eq!(next.status, VerificationStatus::New);
    }

    #[test]
    fn lock_holds_until_it_elapses() {
        let policy = AttemptPolicy::default();
        let (locked, _) = policy.apply_outcome(&with_attempts(5), false, at(0));

        let lock = policy.evaluate_lock(&locked, at(3)).unwrap();
        assert_eq!(lock.wait_minutes, 7);
        assert!(policy.evaluate_lock(&locked, at(10)).is_none());
        assert!(policy.evaluate_lock(&locked, at(11)).is_none());
    }

    #[test]
    fn wait_is_rounded_up() {
        let policy = AttemptPolicy::default();
        let state = VerificationAttemptState {
            locked_until: Some(at(10)),
            ..Default::default()
        };
        let lock = policy
            .evaluate_lock(&state, at(9) + Duration::seconds(59))
            .unwrap();
        assert_eq!(lock.wait_minutes, 1);
        let lock = policy
            .evaluate_lock(&state, at(0) + Duration::seconds(1))
            .unwrap();
        assert_eq!(lock.wait_minutes, 10);
    }

    #[test]
    fn manual_review_offered_from_third_failure() {
        let policy = AttemptPolicy::default();
        let mut state = with_attempts(0);
        let mut offered = Vec::new();
        for _ in 0..5 {
            let (next, transition) = policy.apply_outcome(&state, false, at(0));
            match transition {
                Transition::Retry { attempts, can_manual } => {
                    assert_eq!(attempts, next.attempts);
                    offered.push(can_manual);
                }
                other => panic!("unexpected {other:?}"),
            }
            state = next;
        }
        assert_eq!(offered, vec![false, false, true, true, true]);

        // The sixth imposes a lock, which never offers manual review.
        let (_, transition) = policy.apply_outcome(&state, false, at(0));
        assert!(matches!(transition, Transition::Locked { .. }));
    }

    #[test]
    fn approval_clears_everything() {
        let policy = AttemptPolicy::default();
        let state = VerificationAttemptState {
            attempts: 4,
            locked_until: Some(at(-5)),
            ..Default::default()
        };
        let (next, transition) = policy.apply_outcome(&state, true, at(0));
        assert_eq!(transition, Transition::Approved);
        assert_eq!(next.status, VerificationStatus::Approved);
        assert_eq!(next.attempts, 0);
        assert_eq!(next.locked_until, None);
    }

    #[test]
    fn manual_escalation_records_documents() {
        let policy = AttemptPolicy::default();
        let docs = serde_json::json!(["uploads/u1/card.jpg"]);
        let next = policy.apply_manual(&with_attempts(2), docs.clone(), at(0));
        assert_eq!(next.status, VerificationStatus::Pending);
        assert_eq!(next.attempts, 0);
        assert_eq!(next.documents, docs);
        assert_eq!(next.submitted_at, Some(at(0)));
    }

    #[test]
    fn policy_does_not_touch_version() {
        let policy = AttemptPolicy::default();
        let state = VerificationAttemptState {
            version: 7,
            ..Default::default()
        };
        assert_eq!(policy.apply_outcome(&state, false, at(0)).0.version, 7);
        assert_eq!(policy.apply_manual(&state, serde_json::Value::Null, at(0)).version, 7);
    }
}
