//! Continuous-refill token bucket (§4.2).
//!
//! `tryConsume(n)` refills first (`tokens = min(capacity, tokens +
//! elapsed·rate)`, updating `lastRefillAt`), then admits if `tokens ≥ n`.
//! Bucket state mutation is atomic per key — callers hold the bucket's
//! own lock for the full refill-then-consume sequence.

use std::time::Instant;

/// `{capacity, refillRatePerSecond, tokens, lastRefillAt}` per rate-limit
/// key (§3). `tokens` is a continuous quantity; `0 ≤ tokens ≤ capacity`
/// always holds (§8 invariant).
#[derive(Debug, Clone)]
pub struct TokenBucketState {
    capacity: f64,
    refill_rate_per_second: f64,
    tokens: f64,
    last_refill_at: Instant,
}

/// Outcome of a single `tryConsume` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsumeOutcome {
    pub allowed: bool,
    /// Tokens remaining after this call (floored when reported externally
    /// per §9 "Implementers MUST refill before reporting").
    pub remaining: f64,
}

impl TokenBucketState {
    pub fn new(capacity: f64, refill_rate_per_second: f64) -> Self {
        Self {
            capacity,
            refill_rate_per_second,
            tokens: capacity,
            last_refill_at: Instant::now(),
        }
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn refill_rate_per_second(&self) -> f64 {
        self.refill_rate_per_second
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill_at).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate_per_second).min(self.capacity);
        self.last_refill_at = now;
    }

    /// Refill, then consume `n` tokens if available.
    pub fn try_consume(&mut self, n: f64, now: Instant) -> ConsumeOutcome {
        self.refill(now);
        if self.tokens >= n {
            self.tokens -= n;
            ConsumeOutcome { allowed: true, remaining: self.tokens }
        } else {
            ConsumeOutcome { allowed: false, remaining: self.tokens }
        }
    }

    /// Seconds until `n` tokens will be available, refilling first.
    /// Zero when already available.
    pub fn seconds_until_available(&mut self, n: f64, now: Instant) -> f64 {
        self.refill(now);
        if self.tokens >= n {
            0.0
        } else {
            (n - self.tokens) / self.refill_rate_per_second
        }
    }

    pub fn tokens(&self) -> f64 {
        self.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_tokens_never_exceed_capacity() {
        let mut bucket = TokenBucketState::new(10.0, 1.0);
        let far_future = Instant::now() + Duration::from_secs(1000);
        bucket.refill(far_future);
        assert_eq!(bucket.tokens(), 10.0);
    }

    #[test]
    fn test_tokens_never_negative() {
        let mut bucket = TokenBucketState::new(5.0, 1.0);
        for _ in 0..10 {
            bucket.try_consume(1.0, Instant::now());
        }
        assert!(bucket.tokens() >= 0.0);
    }

    #[test]
    fn test_spec_scenario_burst_of_ten_then_reject() {
        let t0 = Instant::now();
        let mut bucket = TokenBucketState::new(10.0, 1.0);
        for _ in 0..10 {
            let outcome = bucket.try_consume(1.0, t0);
            assert!(outcome.allowed);
        }
        let eleventh = bucket.try_consume(1.0, t0);
        assert!(!eleventh.allowed);

        let one_second_later = t0 + Duration::from_secs(1);
        let twelfth = bucket.try_consume(1.0, one_second_later);
        assert!(twelfth.allowed);
    }

    #[test]
    fn test_continuous_refill_at_exact_rate_admits_indefinitely() {
        let t0 = Instant::now();
        let mut bucket = TokenBucketState::new(1.0, 1.0);
        // Consuming at exactly the refill rate should admit every tick.
        for i in 0..50 {
            let now = t0 + Duration::from_secs(i);
            let outcome = bucket.try_consume(1.0, now);
            assert!(outcome.allowed, "tick {i} should admit");
        }
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    proptest! {
        // §8 invariant: 0 <= tokens <= capacity holds across any sequence
        // of consumes and elapsed-time advances.
        #[test]
        fn tokens_stay_within_bounds(
            capacity in 1.0f64..1000.0,
            refill_rate in 0.0f64..100.0,
            consumes in proptest::collection::vec((0.0f64..20.0, 0u32..600), 0..50),
        ) {
            let t0 = Instant::now();
            let mut bucket = TokenBucketState::new(capacity, refill_rate);
            let mut elapsed_secs = 0u64;
            for (amount, advance_secs) in consumes {
                elapsed_secs += advance_secs as u64;
                let now = t0 + Duration::from_secs(elapsed_secs);
                bucket.try_consume(amount, now);
                prop_assert!(bucket.tokens() >= 0.0);
                prop_assert!(bucket.tokens() <= capacity + 1e-9);
            }
        }
    }
}
