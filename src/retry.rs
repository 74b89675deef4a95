//! Retry policy for remote calls and the global shutdown signal.
//!
//! Transient failures (`DDosProtection`, `Temporary`) are retried up to
//! `max_retries` times. Rate limiting additionally backs off exponentially
//! before the next attempt. Fatal failures are returned on first sight.
//! Order placement runs with [`RetryPolicy::none`] so a submitted order is
//! never sent twice.
//!
//! The backoff sleep is the only intentional delay in the core and wakes up
//! immediately when [`Shutdown::trigger`] is called.

use crate::error::ExchangeError;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const DEFAULT_RETRY_COUNT: u32 = 4;

/// Process-wide shutdown flag with an interruptible sleep.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        let (flag, signal) = &*self.inner;
        let mut requested = flag.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *requested = true;
        signal.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        let (flag, _) = &*self.inner;
        *flag.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sleeps for `duration`. Returns false if woken early by shutdown.
    pub fn sleep(&self, duration: Duration) -> bool {
        let (flag, signal) = &*self.inner;
        let deadline = Instant::now() + duration;
        let mut requested = flag.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        while !*requested {
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            let (guard, _) = signal
                .wait_timeout(requested, deadline - now)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            requested = guard;
        }
        false
    }
}

/// Retry settings as they appear in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_RETRY_COUNT,
            backoff_base_ms: 1_000,
            backoff_max_ms: 60_000,
        }
    }
}

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            backoff_max: Duration::from_millis(config.backoff_max_ms),
        }
    }
}

impl RetryPolicy {
    /// No retries. For calls whose side effect must not be duplicated.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0 based): base * 2^attempt, capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(31)).unwrap_or(u32::MAX);
        self.backoff_base
            .checked_mul(factor)
            .unwrap_or(self.backoff_max)
            .min(self.backoff_max)
    }

    /// Runs `call` until it succeeds, fails fatally, or the budget is spent.
    pub fn run<T, F>(&self, shutdown: &Shutdown, operation: &str, mut call: F) -> Result<T, ExchangeError>
    where
        F: FnMut() -> Result<T, ExchangeError>,
    {
        let mut attempt = 0;
        loop {
            if shutdown.is_triggered() {
                debug!(operation, "shutdown requested, not issuing call");
                return Err(ExchangeError::Shutdown);
            }

            let err = match call() {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_transient() {
                return Err(err);
            }

            if attempt >= self.max_retries {
                if self.max_retries > 0 {
                    warn!(operation, attempts = attempt + 1, error = %err, "giving up retrying");
                }
                return Err(match err {
                    ExchangeError::DDosProtection(msg) => ExchangeError::Temporary(msg),
                    other => other,
                });
            }

            warn!(
                operation,
                retries_left = self.max_retries - attempt,
                error = %err,
                "retrying after transient error"
            );

            if matches!(err, ExchangeError::DDosProtection(_)) {
                let delay = self.backoff(attempt);
                debug!(operation, delay_ms = delay.as_millis() as u64, "backing off");
                if !shutdown.sleep(delay) {
                    return Err(ExchangeError::Shutdown);
                }
            }
            attempt += 1;
        }
    }
}
