//! Fixed-window limiter guarding outbound LLM calls.

use std::sync::{Mutex, PoisonError};

use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::error::LLMError;

#[derive(Debug)]
struct Window {
    started_at: Instant,
    count: u32,
}

/// Admits at most `max_requests` calls per `interval`.
///
/// The window starts at construction and is moved to "now" by the first call that
/// observes it expired; the count never exceeds the budget.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use inkstream::config::RateLimitConfig;
/// use inkstream::rate_limit::RateLimiter;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let limiter = RateLimiter::new(RateLimitConfig {
///     max_requests: 1,
///     interval: Duration::from_secs(60),
/// });
/// assert!(limiter.check_limit().is_ok());
/// assert!(limiter.check_limit().unwrap_err().is_rate_limited());
/// # });
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    window: Mutex<Window>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            window: Mutex::new(Window {
                started_at: Instant::now(),
                count: 0,
            }),
        }
    }

    /// Records one call against the current window.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::RateLimitExceeded`] with the time left in the window when the
    /// budget is spent.
    pub fn check_limit(&self) -> Result<(), LLMError> {
        let now = Instant::now();
        // Window updates are single assignments, so a poisoned lock still holds valid state.
        let mut window = self.window.lock().unwrap_or_else(PoisonError::into_inner);

        let elapsed = now.saturating_duration_since(window.started_at);
        if elapsed >= self.config.interval {
            window.started_at = now;
            window.count = 0;
        }

        if window.count >= self.config.max_requests {
            let elapsed = now.saturating_duration_since(window.started_at);
            return Err(LLMError::RateLimitExceeded {
                retry_after: self.config.interval.saturating_sub(elapsed),
            });
        }

        window.count += 1;
        Ok(())
    }
}
