//! Circuit breaker state machine.
//!
//! The breaker counts consecutive failures. Once the count reaches the
//! threshold it is open until `cooldown` has elapsed since the most recent
//! failure. After that it is half-open: the next attempt is let through, a
//! failure reopens it with a fresh cooldown and a success closes it.
//!
//! All methods take `now` explicitly so transitions can be tested without
//! sleeping.

use std::time::{Duration, Instant};

use serde::Serialize;

/// Observable outcome of recording a result on the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerTransition {
    /// Nothing changed from the caller's point of view.
    Unchanged,
    /// The breaker just opened.
    Opened,
    /// The breaker was tripped and has just closed again.
    Closed,
}

/// Point-in-time view of the breaker for health output and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub failure_count: u32,
    pub threshold: u32,
    pub is_open: bool,
}

#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    failure_count: u32,
    threshold: u32,
    cooldown: Duration,
    last_failure: Option<Instant>,
}

impl CircuitBreaker {
    /// Creates a closed breaker. A threshold of 0 is treated as 1.
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_count: 0,
            threshold: threshold.max(1),
            cooldown,
            last_failure: None,
        }
    }

    fn is_tripped(&self) -> bool {
        self.failure_count >= self.threshold
    }

    /// True while the breaker rejects attempts.
    pub fn is_open(&self, now: Instant) -> bool {
        self.is_tripped()
            && self
                .last_failure
                .is_some_and(|at| now.saturating_duration_since(at) < self.cooldown)
    }

    /// True when the breaker is tripped but its cooldown has elapsed, so the
    /// next attempt acts as a probe.
    pub fn is_half_open(&self, now: Instant) -> bool {
        self.is_tripped() && !self.is_open(now)
    }

    /// Records a failed attempt.
    pub fn record_failure(&mut self, now: Instant) -> BreakerTransition {
        let was_open = self.is_open(now);
        self.failure_count = self.failure_count.saturating_add(1);
        self.last_failure = Some(now);

        if !was_open && self.is_open(now) {
            BreakerTransition::Opened
        } else {
            BreakerTransition::Unchanged
        }
    }

    /// Records a successful attempt, resetting the failure count.
    pub fn record_success(&mut self) -> BreakerTransition {
        let was_tripped = self.is_tripped();
        self.failure_count = 0;
        self.last_failure = None;

        if was_tripped {
            BreakerTransition::Closed
        } else {
            BreakerTransition::Unchanged
        }
    }

    /// Forces the breaker open, e.g. after reconnect attempts are exhausted.
    pub fn trip(&mut self, now: Instant) -> BreakerTransition {
        let was_open = self.is_open(now);
        self.failure_count = self.failure_count.max(self.threshold);
        self.last_failure = Some(now);

        if was_open {
            BreakerTransition::Unchanged
        } else {
            BreakerTransition::Opened
        }
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn snapshot(&self, now: Instant) -> BreakerSnapshot {
        BreakerSnapshot {
            failure_count: self.failure_count,
            threshold: self.threshold,
            is_open: self.is_open(now),
        }
    }
}
