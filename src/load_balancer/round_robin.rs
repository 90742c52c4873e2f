//! Round-robin selection policy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::PoolError;
use crate::load_balancer::backend::BackendEntry;
use crate::load_balancer::SelectionPolicy;

/// Round-robin selector. A single monotonically increasing counter is
/// shared across requests and never reset; under a stable snapshot it
/// cycles deterministically through every position.
#[derive(Debug, Default)]
pub struct RoundRobin {
    next: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectionPolicy for RoundRobin {
    fn select(&self, snapshot: &[Arc<BackendEntry>]) -> Result<Arc<BackendEntry>, PoolError> {
        if snapshot.is_empty() {
            return Err(PoolError::NoServers);
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % snapshot.len();
        Ok(snapshot[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::BackendProxy;
    use url::Url;

    fn entry(url: &str) -> Arc<BackendEntry> {
        Arc::new(BackendEntry::new(
            url.to_string(),
            BackendProxy::new(Url::parse(url).unwrap()),
        ))
    }

    #[test]
    fn cycles_through_every_position_under_a_stable_snapshot() {
        let policy = RoundRobin::new();
        let snapshot = vec![entry("http://localhost:9001"), entry("http://localhost:9002")];

        let s1 = policy.select(&snapshot).unwrap();
        assert_eq!(s1.url(), "http://localhost:9001/");

        let s2 = policy.select(&snapshot).unwrap();
        assert_eq!(s2.url(), "http://localhost:9002/");

        let s3 = policy.select(&snapshot).unwrap();
        assert_eq!(s3.url(), "http://localhost:9001/");
    }

    #[test]
    fn empty_snapshot_is_no_servers() {
        let policy = RoundRobin::new();
        assert!(matches!(policy.select(&[]), Err(PoolError::NoServers)));
    }
}
