//! Fixed-window request rate limiting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Configuration for the rate limiter.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests allowed per window, per client.
    pub max_requests: u32,
    /// Window length.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(15 * 60),
        }
    }
}

/// Per-client counting window.
#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window rate limiter keyed by client address.
///
/// Windows are not aligned across clients; each client's window starts at
/// its first request and resets when the window length has elapsed.
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: DashMap<String, Window>,
    rejected: AtomicU64,
}

impl RateLimiter {
    /// Creates a limiter with the given configuration.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
            rejected: AtomicU64::new(0),
        }
    }

    /// Admits or rejects a request from the given client key.
    ///
    /// # Errors
    ///
    /// Returns the time remaining until the client's window resets when the
    /// request budget is exhausted.
    pub fn check(&self, key: &str) -> Result<(), Duration> {
        let now = Instant::now();
        let mut window = self.windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        let elapsed = now.duration_since(window.started);
        if elapsed >= self.config.window {
            window.started = now;
            window.count = 0;
        }

        if window.count >= self.config.max_requests {
            let retry_after = self.config.window.saturating_sub(elapsed);
            drop(window);
            self.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(retry_after);
        }

        window.count += 1;
        Ok(())
    }

    /// Returns how many requests have been rejected so far.
    #[must_use]
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Returns the limiter configuration.
    #[must_use]
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
