/**
 * Rate Limiter
 * Fixed-window request counter keyed by caller identifier
 */
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    entries: Arc<RwLock<HashMap<String, Window>>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Count one request for `key`. Returns false once the window is used up.
    pub async fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now()).await
    }

    pub async fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(window) if now < window.reset_at => {
                if window.count >= self.max_requests {
                    return false;
                }
                window.count += 1;
                true
            }
            _ => {
                entries.insert(
                    key.to_string(),
                    Window {
                        count: 1,
                        reset_at: now + self.window,
                    },
                );
                true
            }
        }
    }

    /// Drop windows that have expired. Returns how many were removed.
    pub async fn prune(&self) -> usize {
        self.prune_at(Instant::now()).await
    }

    pub async fn prune_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, window| now < window.reset_at);
        before - entries.len()
    }

    pub async fn tracked(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Run [`RateLimiter::prune`] every `every` until the runtime shuts down.
    pub fn spawn_pruner(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = limiter.prune().await;
                if removed > 0 {
                    tracing::debug!(removed, "pruned expired rate limit windows");
                }
            }
        })
    }
}
