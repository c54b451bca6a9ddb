//! In-memory login throttle.
//!
//! Attempts are counted per client key inside a fixed window. State lives in
//! the process and is lost on restart.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::warn;

/// Attempts allowed per window.
pub const LOGIN_ATTEMPTS: u32 = 10;
/// Window length.
pub const LOGIN_WINDOW: Duration = Duration::from_secs(3 * 60);

#[derive(Debug)]
struct Window {
    started: Instant,
    attempts: u32,
}

#[derive(Clone)]
pub struct LoginRateLimiter {
    windows: Arc<RwLock<HashMap<String, Window>>>,
    limit: u32,
    window: Duration,
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new(LOGIN_ATTEMPTS, LOGIN_WINDOW)
    }
}

impl LoginRateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            windows: Arc::new(RwLock::new(HashMap::new())),
            limit,
            window,
        }
    }

    /// Record an attempt for `key`; returns false once the limit is exceeded.
    pub async fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.write().await;

        // Drop expired windows so the map doesn't grow without bound
        windows.retain(|_, w| now.duration_since(w.started) < self.window);

        let entry = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            attempts: 0,
        });
        entry.attempts += 1;

        if entry.attempts > self.limit {
            warn!("Login rate limit hit for {}", key);
            false
        } else {
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_limit_per_key() {
        let limiter = LoginRateLimiter::new(3, Duration::from_secs(60));
        for _ in 0..3 {
            assert!(limiter.check("10.0.0.1").await);
        }
        assert!(!limiter.check("10.0.0.1").await);
        assert!(limiter.check("10.0.0.2").await);
    }

    #[tokio::test]
    async fn test_window_expires() {
        let limiter = LoginRateLimiter::new(1, Duration::from_millis(20));
        assert!(limiter.check("k").await);
        assert!(!limiter.check("k").await);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(limiter.check("k").await);
    }
}
