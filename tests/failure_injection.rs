//! End-to-end scenarios against a real HTTP listener and mock backends.
//!
//! Each test spins up the Dispatcher behind a real `HttpServer`, mock
//! backends on loopback sockets, and drives it with `reqwest`. Scenario
//! 6 (reload) exercises `DynamicPool::update` directly rather than
//! raising a real `SIGHUP`, since multiple tests share one process and
//! a real signal would be delivered to all of them.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reverse_proxy::config::schema::RateLimiterDefaults;
use reverse_proxy::dispatcher::Dispatcher;
use reverse_proxy::error::PoolError;
use reverse_proxy::http::HttpServer;
use reverse_proxy::lifecycle::Shutdown;
use reverse_proxy::load_balancer::backend::BackendEntry;
use reverse_proxy::load_balancer::pool::DynamicPool;
use reverse_proxy::load_balancer::round_robin::RoundRobin;
use reverse_proxy::load_balancer::SelectionPolicy;
use reverse_proxy::security::rate_limit::Limiter;
use reverse_proxy::security::registry::InMemoryClientStore;

mod common;

/// Start a dispatcher-backed server on an ephemeral port; returns the
/// base URL. `shutdown` must be triggered by the caller when the test
/// is done with it.
async fn start_server(pool: Arc<DynamicPool>, limiter: Option<Arc<Limiter>>, shutdown: &Shutdown) -> String {
    start_server_with_policy(pool, Arc::new(RoundRobin::new()), limiter, shutdown).await
}

/// Same as `start_server`, but with an injectable selection policy — used
/// where a test needs a deterministic attempt order instead of whatever
/// `Pool::alive()`'s `HashMap` iteration happens to yield.
async fn start_server_with_policy(
    pool: Arc<DynamicPool>,
    policy: Arc<dyn SelectionPolicy>,
    limiter: Option<Arc<Limiter>>,
    shutdown: &Shutdown,
) -> String {
    let dispatcher = Arc::new(Dispatcher::new(pool, policy, limiter.clone()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = HttpServer::new(dispatcher, limiter).run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    format!("http://{addr}")
}

/// Selects snapshot entries in ascending URL order rather than whatever
/// order the snapshot arrived in, so a fail-over test can pin which
/// entry is tried first regardless of `HashMap` iteration order.
struct UrlOrderedPolicy {
    next: AtomicUsize,
}

impl UrlOrderedPolicy {
    fn new() -> Self {
        Self { next: AtomicUsize::new(0) }
    }
}

impl SelectionPolicy for UrlOrderedPolicy {
    fn select(&self, snapshot: &[Arc<BackendEntry>]) -> Result<Arc<BackendEntry>, PoolError> {
        if snapshot.is_empty() {
            return Err(PoolError::NoServers);
        }
        let mut ordered: Vec<&Arc<BackendEntry>> = snapshot.iter().collect();
        ordered.sort_by(|a, b| a.url().cmp(b.url()));
        let index = self.next.fetch_add(1, Ordering::Relaxed) % ordered.len();
        Ok(ordered[index].clone())
    }
}

fn pool_with(urls: &[String]) -> Arc<DynamicPool> {
    let pool = Arc::new(DynamicPool::with_default_factory());
    pool.update(urls.to_vec()).unwrap();
    pool
}

async fn collect_statuses(url: &str, n: usize) -> Vec<u16> {
    let mut statuses = Vec::with_capacity(n);
    for _ in 0..n {
        let res = reqwest::get(url).await.unwrap();
        statuses.push(res.status().as_u16());
    }
    statuses
}

#[tokio::test]
async fn single_healthy_backend_passes_response_through() {
    let backend_addr: SocketAddr = "127.0.0.1:29101".parse().unwrap();
    common::start_mock_backend(backend_addr, "hello from backend").await;

    let pool = pool_with(&[format!("http://{backend_addr}")]);
    let shutdown = Shutdown::new();
    let url = start_server(pool, None, &shutdown).await;

    let res = reqwest::get(&url).await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "hello from backend");

    shutdown.trigger();
}

#[tokio::test]
async fn backend_4xx_passes_through_and_entry_stays_alive() {
    let backend_addr: SocketAddr = "127.0.0.1:29102".parse().unwrap();
    common::start_programmable_backend(backend_addr, || async { (400, "bad request".to_string()) }).await;

    let pool = pool_with(&[format!("http://{backend_addr}")]);
    let shutdown = Shutdown::new();
    let url = start_server(pool.clone(), None, &shutdown).await;

    let res = reqwest::get(&url).await.unwrap();
    assert_eq!(res.status(), 400);
    assert_eq!(pool.alive().unwrap().len(), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn failing_backend_fails_over_to_the_next_and_is_marked_dead() {
    // `UrlOrderedPolicy` pins the attempt order to "29103 before 29104"
    // regardless of `Pool::alive()`'s `HashMap` iteration order, so the
    // 500 backend is always tried (and marked dead) before the healthy
    // one — otherwise this test is flaky whenever the healthy backend
    // happens to land first in the snapshot.
    let a_addr: SocketAddr = "127.0.0.1:29103".parse().unwrap();
    let b_addr: SocketAddr = "127.0.0.1:29104".parse().unwrap();
    common::start_programmable_backend(a_addr, || async { (500, "broken".to_string()) }).await;
    common::start_mock_backend(b_addr, "b is fine").await;

    let pool = pool_with(&[format!("http://{a_addr}"), format!("http://{b_addr}")]);
    let shutdown = Shutdown::new();
    let url = start_server_with_policy(pool.clone(), Arc::new(UrlOrderedPolicy::new()), None, &shutdown).await;

    let res = reqwest::get(&url).await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "b is fine");

    let alive = pool.alive().unwrap();
    assert_eq!(alive.len(), 1);
    assert!(alive[0].url().contains("29104"));

    shutdown.trigger();
}

#[tokio::test]
async fn empty_pool_yields_503() {
    let pool = Arc::new(DynamicPool::with_default_factory());
    let shutdown = Shutdown::new();
    let url = start_server(pool, None, &shutdown).await;

    let res = reqwest::get(&url).await.unwrap();
    assert_eq!(res.status(), 503);

    shutdown.trigger();
}

#[tokio::test]
async fn rate_limited_client_is_denied_then_recovers_after_refill() {
    let backend_addr: SocketAddr = "127.0.0.1:29105".parse().unwrap();
    common::start_mock_backend(backend_addr, "ok").await;

    let pool = pool_with(&[format!("http://{backend_addr}")]);
    let store = Arc::new(InMemoryClientStore::default());
    let limiter = Arc::new(
        Limiter::new(
            RateLimiterDefaults {
                default_capacity: 2,
                default_refill_rate: Duration::from_millis(200),
            },
            store,
        )
        .await
        .unwrap(),
    );
    limiter
        .set_client("127.0.0.1".parse().unwrap(), Some(2), Some(Duration::from_millis(200)))
        .await
        .unwrap();

    let shutdown = Shutdown::new();
    limiter.clone().spawn_refill_loop(Duration::from_millis(50), shutdown.subscribe());
    let url = start_server(pool, Some(limiter), &shutdown).await;

    let statuses = collect_statuses(&url, 3).await;
    assert_eq!(statuses, vec![200, 200, 429]);

    tokio::time::sleep(Duration::from_millis(300)).await;
    let res = reqwest::get(&url).await.unwrap();
    assert_eq!(res.status(), 200);

    shutdown.trigger();
}

#[tokio::test]
async fn reconfigure_converges_membership_and_keeps_liveness() {
    let a_addr: SocketAddr = "127.0.0.1:29106".parse().unwrap();
    let b_addr: SocketAddr = "127.0.0.1:29107".parse().unwrap();
    let c_addr: SocketAddr = "127.0.0.1:29108".parse().unwrap();
    common::start_mock_backend(a_addr, "a").await;
    common::start_mock_backend(b_addr, "b").await;
    common::start_mock_backend(c_addr, "c").await;

    let pool = pool_with(&[format!("http://{a_addr}"), format!("http://{b_addr}")]);

    pool.update(vec![format!("http://{b_addr}"), format!("http://{c_addr}")]).unwrap();

    let alive = pool.alive().unwrap();
    let urls: Vec<&str> = alive.iter().map(|e| e.url()).collect();
    assert!(!urls.iter().any(|u| u.contains("29106")));
    assert!(urls.iter().any(|u| u.contains("29107")));
    assert!(urls.iter().any(|u| u.contains("29108")));
}
