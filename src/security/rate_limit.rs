//! Token-Bucket Limiter: per-IP admission decisions backed by a durable
//! client registry.
//!
//! # Invariants
//! - (B1) `0 <= tokens <= capacity` at every externally observable
//!   moment.
//! - (B2) tokens are only decremented on a successful admission and
//!   only incremented on a refill tick.
//!
//! # Concurrency
//! - The client map uses a reader-writer lock; each bucket has its own
//!   mutex so admissions on different IPs never contend.
//! - Registration/de-registration write through to the registry before
//!   taking the map's writer lock — the lock is never held across
//!   blocking I/O.
//! - The refill loop takes the map's reader lock, then each bucket's
//!   mutex in turn.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

use crate::config::schema::RateLimiterDefaults;
use crate::error::LimiterError;
use crate::security::registry::ClientStore;

struct TokenBucket {
    capacity: u32,
    tokens: u32,
    refill_every: Duration,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: u32, refill_every: Duration) -> Self {
        Self {
            capacity,
            tokens: capacity,
            refill_every,
            last_refill: Instant::now(),
        }
    }

    /// No lazy refill here by design — admission only ever decrements.
    fn try_admit(&mut self) -> bool {
        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        let added = (elapsed.as_nanos() / self.refill_every.as_nanos().max(1)) as u32;
        if added > 0 {
            self.tokens = self.tokens.saturating_add(added).min(self.capacity);
            self.last_refill = now;
        }
    }
}

/// Per-IP admission engine with a durable client registry.
pub struct Limiter {
    defaults: RateLimiterDefaults,
    store: Arc<dyn ClientStore>,
    clients: RwLock<HashMap<IpAddr, Arc<Mutex<TokenBucket>>>>,
}

impl Limiter {
    /// Build a limiter and repopulate its in-memory buckets from the
    /// durable registry's current contents. No client is auto-registered
    /// beyond what the registry already held.
    pub async fn new(defaults: RateLimiterDefaults, store: Arc<dyn ClientStore>) -> Result<Self, LimiterError> {
        let mut clients = HashMap::new();
        for record in store.load_all().await? {
            if let Ok(ip) = record.ip.parse::<IpAddr>() {
                clients.insert(ip, Arc::new(Mutex::new(TokenBucket::new(record.capacity, record.refill_every))));
            }
        }

        Ok(Self {
            defaults,
            store,
            clients: RwLock::new(clients),
        })
    }

    /// Register (or re-register) a client. Missing parameters substitute
    /// the configured defaults. Re-registering resets the bucket.
    pub async fn set_client(
        &self,
        ip: IpAddr,
        capacity: Option<u32>,
        refill_every: Option<Duration>,
    ) -> Result<(), LimiterError> {
        let capacity = capacity.unwrap_or(self.defaults.default_capacity);
        let refill_every = refill_every.unwrap_or(self.defaults.default_refill_rate);

        self.store.upsert(&ip.to_string(), capacity, refill_every).await?;

        let bucket = Arc::new(Mutex::new(TokenBucket::new(capacity, refill_every)));
        self.clients.write().expect("client map poisoned").insert(ip, bucket);
        Ok(())
    }

    /// De-register a client. Write-through delete first, then drop the
    /// in-memory bucket.
    pub async fn remove_client(&self, ip: IpAddr) -> Result<(), LimiterError> {
        self.store.delete(&ip.to_string()).await?;
        self.clients.write().expect("client map poisoned").remove(&ip);
        Ok(())
    }

    /// Admission decision. Unregistered clients are always denied; no
    /// lazy refill happens here.
    pub fn allow(&self, ip: IpAddr) -> bool {
        let bucket = {
            let clients = self.clients.read().expect("client map poisoned");
            clients.get(&ip).cloned()
        };

        match bucket {
            Some(bucket) => bucket.lock().expect("bucket mutex poisoned").try_admit(),
            None => false,
        }
    }

    /// Spawn the background refill loop, ticking at `interval`. Dropping
    /// (or triggering) `shutdown` stops the loop.
    pub fn spawn_refill_loop(self: Arc<Self>, interval: Duration, mut shutdown: broadcast::Receiver<()>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let now = Instant::now();
                        let clients = self.clients.read().expect("client map poisoned");
                        for bucket in clients.values() {
                            bucket.lock().expect("bucket mutex poisoned").refill(now);
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::info!("rate limiter refill loop shutting down");
                        break;
                    }
                }
            }
        })
    }
}
