//! Admission result type and the distributed-store seam (§4.2, §9 open
//! admission question, SPEC_FULL §4.2 supplement).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// `{allowed, remainingTokens, limit, resetAt, retryAfterSeconds, reason?}`
/// (§4.2). `resetAt` is `now` when tokens are available, else
/// `now + (1-tokens)/rate`; `retryAfterSeconds = ceil(resetAt - now)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionResult {
    pub allowed: bool,
    pub remaining_tokens: u64,
    pub limit: u64,
    pub reset_at: DateTime<Utc>,
    pub retry_after_seconds: u64,
    pub reason: Option<String>,
}

/// Optional seam for a multi-instance rate-limit backend (§9 Global
/// State, SPEC_FULL §4.2). Only the in-memory, single-node
/// implementation ([`crate::rate_limit::RateLimiter`]) is provided in
/// this crate; a distributed deployment would implement this trait
/// against Redis or an equivalent store.
#[async_trait]
pub trait DistributedRateStore: Send + Sync {
    /// Tokens currently available for `key`, refilling as needed.
    async fn get_remaining(&self, key: &str) -> Option<f64>;
    /// Attempt to consume `n` tokens for `key`; `true` if admitted.
    async fn try_consume(&self, key: &str, n: f64) -> bool;
    /// Reset `key` to full capacity.
    async fn reset(&self, key: &str);
}
