//! In-memory sliding-window rate limiting for guest-facing endpoints.
//!
//! Counts are per process and lost on restart.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::RateLimitConfig;

/// Allows at most `max_requests` per client key within any `window`.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    max_requests: usize,
    window: Duration,
    hits: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window: config.window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Records a request for `key`; returns false if it is over budget.
    ///
    /// Rejected requests are not recorded.
    pub async fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut hits = self.hits.lock().await;
        let window = hits.entry(key.to_string()).or_default();

        while window
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.window)
        {
            window.pop_front();
        }

        if window.len() >= self.max_requests {
            metrics::counter!("rate_limited_total").increment(1);
            tracing::warn!(client = %key, "Rate limit exceeded");
            return false;
        }
        window.push_back(now);
        true
    }

    /// Drops keys whose requests have all left the window.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut hits = self.hits.lock().await;
        let before = hits.len();
        hits.retain(|_, window| {
            window
                .back()
                .is_some_and(|t| now.duration_since(*t) < self.window)
        });
        before - hits.len()
    }

    /// Number of keys currently tracked.
    pub async fn tracked_keys(&self) -> usize {
        self.hits.lock().await.len()
    }

    /// Runs [`sweep`](Self::sweep) every `every` until the task is aborted.
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let evicted = self.sweep().await;
                if evicted > 0 {
                    tracing::debug!(evicted, "Rate limiter swept idle clients");
                }
            }
        })
    }
}

/// Identifies the client behind a request.
///
/// Uses the first `X-Forwarded-For` hop, then `X-Real-IP`.
pub fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("unknown")
        .to_string()
}
