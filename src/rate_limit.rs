//! In-memory rate limiting for login attempts.
//!
//! DESIGN
//! ======
//! Sliding-window counters backed by `HashMap<String, VecDeque<Instant>>`,
//! keyed by the submitted login identifier (phone or username). Two limits
//! enforced:
//! - Per-identifier: 10 attempts/min
//! - Global: 120 attempts/min

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const DEFAULT_PER_IDENTIFIER_LIMIT: usize = 10;
const DEFAULT_PER_IDENTIFIER_WINDOW_SECS: u64 = 60;

const DEFAULT_GLOBAL_LIMIT: usize = 120;
const DEFAULT_GLOBAL_WINDOW_SECS: u64 = 60;

#[derive(Clone, Copy)]
struct RateLimitConfig {
    per_identifier_limit: usize,
    per_identifier_window: Duration,
    global_limit: usize,
    global_window: Duration,
}

impl RateLimitConfig {
    fn from_env() -> Self {
        let per_identifier_window_secs =
            env_parse("LOGIN_RATE_LIMIT_WINDOW_SECS", DEFAULT_PER_IDENTIFIER_WINDOW_SECS);
        let global_window_secs = env_parse("LOGIN_RATE_LIMIT_GLOBAL_WINDOW_SECS", DEFAULT_GLOBAL_WINDOW_SECS);

        Self {
            per_identifier_limit: env_parse("LOGIN_RATE_LIMIT_PER_IDENTIFIER", DEFAULT_PER_IDENTIFIER_LIMIT),
            per_identifier_window: Duration::from_secs(per_identifier_window_secs),
            global_limit: env_parse("LOGIN_RATE_LIMIT_GLOBAL", DEFAULT_GLOBAL_LIMIT),
            global_window: Duration::from_secs(global_window_secs),
        }
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("too many login attempts (max {limit} per {window_secs}s)")]
    IdentifierExceeded { limit: usize, window_secs: u64 },
    #[error("login temporarily unavailable (max {limit} attempts per {window_secs}s)")]
    GlobalExceeded { limit: usize, window_secs: u64 },
}

// =============================================================================
// RATE LIMITER
// =============================================================================

#[derive(Clone)]
pub struct LoginRateLimiter {
    inner: Arc<Mutex<LoginRateLimiterInner>>,
    config: RateLimitConfig,
}

struct LoginRateLimiterInner {
    /// Per-identifier attempt timestamps.
    identifier_attempts: HashMap<String, VecDeque<Instant>>,
    /// Global attempt timestamps.
    global_attempts: VecDeque<Instant>,
}

impl LoginRateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(LoginRateLimiterInner {
                identifier_attempts: HashMap::new(),
                global_attempts: VecDeque::new(),
            })),
            config: RateLimitConfig::from_env(),
        }
    }

    /// Check both limits, then record the attempt.
    pub fn check_and_record(&self, identifier: &str) -> Result<(), RateLimitError> {
        self.check_and_record_at(identifier, Instant::now())
    }

    /// Internal: check + record with explicit timestamp (for testing).
    fn check_and_record_at(&self, identifier: &str, now: Instant) -> Result<(), RateLimitError> {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let cfg = self.config;

        prune_window(&mut inner.global_attempts, now, cfg.global_window);
        if inner.global_attempts.len() >= cfg.global_limit {
            return Err(RateLimitError::GlobalExceeded {
                limit: cfg.global_limit,
                window_secs: cfg.global_window.as_secs(),
            });
        }

        let deque = inner
            .identifier_attempts
            .entry(identifier.to_owned())
            .or_default();
        prune_window(deque, now, cfg.per_identifier_window);
        if deque.len() >= cfg.per_identifier_limit {
            return Err(RateLimitError::IdentifierExceeded {
                limit: cfg.per_identifier_limit,
                window_secs: cfg.per_identifier_window.as_secs(),
            });
        }

        deque.push_back(now);
        inner.global_attempts.push_back(now);

        Ok(())
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

fn prune_window(deque: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = deque.front() {
        if now.duration_since(front) > window {
            deque.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
