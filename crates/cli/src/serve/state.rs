//! Shared server state: the backing store, the audit sink, and the
//! per-IP rate limiter.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use docket_engine::MemoryAuditSink;
use docket_storage::MemoryStore;

/// Fixed rate-limit window.
const WINDOW: Duration = Duration::from_secs(60);

/// Requests allowed per window when `DOCKET_RATE_LIMIT` is unset.
const DEFAULT_RATE_LIMIT: u64 = 60;

/// One client's standing within the current window.
struct Window {
    started: Instant,
    requests: u64,
}

/// Fixed-window rate limiter keyed by client IP.
pub(crate) struct RateLimiter {
    windows: Mutex<HashMap<IpAddr, Window>>,
    /// Requests allowed per IP per window.
    pub(crate) limit: u64,
}

impl RateLimiter {
    pub(crate) fn new(limit: u64) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            limit,
        }
    }

    /// Count a request from `ip` against the current window. `Err` carries
    /// the seconds until the window reopens.
    pub(crate) async fn check(&self, ip: IpAddr) -> Result<(), u64> {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();
        let window = windows.entry(ip).or_insert(Window {
            started: now,
            requests: 0,
        });
        if now.duration_since(window.started) >= WINDOW {
            window.started = now;
            window.requests = 0;
        }
        window.requests += 1;
        if window.requests > self.limit {
            let remaining = WINDOW.saturating_sub(now.duration_since(window.started));
            Err(remaining.as_secs())
        } else {
            Ok(())
        }
    }
}

/// State shared by every handler and middleware layer.
pub(crate) struct AppState {
    /// Document store backing every endpoint.
    pub(crate) store: MemoryStore,
    /// Audit sink the executors report to.
    pub(crate) audit: MemoryAuditSink,
    /// Per-IP rate limiter.
    pub(crate) rate_limiter: RateLimiter,
    /// Required API key; `None` disables authentication.
    pub(crate) api_key: Option<String>,
}

impl AppState {
    /// Fresh state with limits and credentials drawn from the environment.
    ///
    /// `DOCKET_RATE_LIMIT` sets requests per minute per IP (default 60).
    /// `DOCKET_API_KEY` sets the required key; unset or empty leaves the
    /// API open.
    pub(crate) fn from_env() -> Self {
        let limit = std::env::var("DOCKET_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT);
        let api_key = std::env::var("DOCKET_API_KEY")
            .ok()
            .filter(|key| !key.is_empty());
        Self {
            store: MemoryStore::new(),
            audit: MemoryAuditSink::new(),
            rate_limiter: RateLimiter::new(limit),
            api_key,
        }
    }
}
