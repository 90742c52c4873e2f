//! Dispatcher: per-request orchestration tying together the rate
//! limiter, the backend pool, the selection policy, and the proxy.
//!
//! # Steps per request
//! 1. If a limiter is configured, extract the client IP from the
//!    request's remote address. A missing/malformed remote address is
//!    `400`. A denied admission is `429`.
//! 2. Take a live snapshot from the pool. An empty pool is `503`.
//! 3. Loop up to `snapshot.len()` times: select an entry, forward the
//!    request. The first success is written back to the caller as-is.
//!    Each failure marks its entry dead (done inside `BackendEntry`) and
//!    the loop tries the next selection.
//! 4. If every attempt in the snapshot fails, the last attempt's own
//!    classified response (504 for a timeout, 502 otherwise) is
//!    returned — see DESIGN.md for why this is more precise than a
//!    blanket "502 Bad Gateway".

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::{to_bytes, Body, Bytes};
use axum::http::{Request, Response, StatusCode};

use crate::load_balancer::pool::DynamicPool;
use crate::load_balancer::SelectionPolicy;
use crate::observability::metrics;
use crate::proxy::ProxyFailure;
use crate::security::rate_limit::Limiter;

/// Request bodies are buffered in full before the first forwarding
/// attempt, so a retry can rebuild an identical request. This bounds
/// the size of a single proxied request body.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub struct Dispatcher {
    pool: Arc<DynamicPool>,
    policy: Arc<dyn SelectionPolicy>,
    limiter: Option<Arc<Limiter>>,
}

impl Dispatcher {
    pub fn new(pool: Arc<DynamicPool>, policy: Arc<dyn SelectionPolicy>, limiter: Option<Arc<Limiter>>) -> Self {
        Self { pool, policy, limiter }
    }

    /// Handle one inbound request. `remote_addr` is `None` when the
    /// server could not determine a peer address for this connection.
    pub async fn dispatch(&self, request: Request<Body>, remote_addr: Option<SocketAddr>) -> Response<Body> {
        let start = Instant::now();
        let method = request.method().clone();

        let response = self.dispatch_inner(request, remote_addr).await;

        metrics::record_request(method.as_str(), response.status().as_u16(), "pool", start);
        response
    }

    async fn dispatch_inner(&self, request: Request<Body>, remote_addr: Option<SocketAddr>) -> Response<Body> {
        if let Some(limiter) = &self.limiter {
            let addr = match remote_addr {
                Some(addr) => addr,
                None => return plain_response(StatusCode::BAD_REQUEST, "malformed remote address"),
            };
            let allowed = limiter.allow(addr.ip());
            metrics::record_admission(allowed);
            if !allowed {
                return plain_response(StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded");
            }
        }

        let snapshot = match self.pool.alive() {
            Ok(snapshot) => snapshot,
            Err(_no_servers) => return plain_response(StatusCode::SERVICE_UNAVAILABLE, "no backends available"),
        };

        let (parts, body) = request.into_parts();
        let body_bytes = match to_bytes(body, MAX_BODY_BYTES).await {
            Ok(bytes) => bytes,
            Err(e) => return plain_response(StatusCode::BAD_REQUEST, &format!("failed to read request body: {e}")),
        };

        let mut last_failure: Option<ProxyFailure> = None;
        for _ in 0..snapshot.len() {
            let entry = match self.policy.select(&snapshot) {
                Ok(entry) => entry,
                Err(_) => return plain_response(StatusCode::SERVICE_UNAVAILABLE, "selection policy error"),
            };

            let attempt = rebuild_request(&parts, &body_bytes);
            match entry.serve(attempt).await {
                Ok(response) => return response,
                Err(failure) => {
                    tracing::warn!(backend = entry.url(), kind = ?failure.kind, "backend attempt failed");
                    metrics::record_backend_health(entry.url(), false);
                    last_failure = Some(failure);
                }
            }
        }

        match last_failure {
            Some(failure) => failure.response,
            None => plain_response(StatusCode::BAD_GATEWAY, "all backends failed"),
        }
    }
}

fn rebuild_request(parts: &axum::http::request::Parts, body: &Bytes) -> Request<Body> {
    let mut builder = Request::builder()
        .method(parts.method.clone())
        .uri(parts.uri.clone())
        .version(parts.version);
    if let Some(headers) = builder.headers_mut() {
        *headers = parts.headers.clone();
    }
    builder
        .body(Body::from(body.clone()))
        .expect("rebuilt request from previously-valid parts is always valid")
}

fn plain_response(status: StatusCode, body: &str) -> Response<Body> {
    Response::builder()
        .status(status)
        .body(Body::from(body.to_string()))
        .expect("static error response is always valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PoolError;
    use crate::load_balancer::backend::BackendEntry;
    use crate::load_balancer::round_robin::RoundRobin;
    use crate::proxy::BackendProxy;
    use url::Url;

    fn pool_with(urls: &[&str]) -> Arc<DynamicPool> {
        let pool = Arc::new(DynamicPool::with_default_factory());
        pool.update(urls.iter().map(|u| u.to_string()).collect()).unwrap();
        pool
    }

    fn get_request() -> Request<Body> {
        Request::builder().method("GET").uri("/").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn empty_pool_yields_503() {
        let pool = Arc::new(DynamicPool::with_default_factory());
        let dispatcher = Dispatcher::new(pool, Arc::new(RoundRobin::new()), None);
        let response = dispatcher.dispatch(get_request(), None).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn missing_remote_addr_with_limiter_is_400() {
        use crate::config::schema::RateLimiterDefaults;
        use crate::security::registry::InMemoryClientStore;
        use std::time::Duration;

        let pool = pool_with(&["http://127.0.0.1:1"]);
        let limiter = Arc::new(
            Limiter::new(
                RateLimiterDefaults {
                    default_capacity: 1,
                    default_refill_rate: Duration::from_secs(1),
                },
                Arc::new(InMemoryClientStore::default()),
            )
            .await
            .unwrap(),
        );
        let dispatcher = Dispatcher::new(pool, Arc::new(RoundRobin::new()), Some(limiter));
        let response = dispatcher.dispatch(get_request(), None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    struct AlwaysFailsPolicy;
    impl SelectionPolicy for AlwaysFailsPolicy {
        fn select(&self, _snapshot: &[Arc<BackendEntry>]) -> Result<Arc<BackendEntry>, PoolError> {
            Err(PoolError::NoServers)
        }
    }

    #[tokio::test]
    async fn policy_error_yields_503() {
        let pool = pool_with(&["http://127.0.0.1:1"]);
        let dispatcher = Dispatcher::new(pool, Arc::new(AlwaysFailsPolicy), None);
        let response = dispatcher.dispatch(get_request(), None).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn unreachable_backend_exhausts_to_a_classified_failure() {
        // Port 1 is a privileged, never-listening port: connection refused.
        let pool = pool_with(&["http://127.0.0.1:1"]);
        let dispatcher = Dispatcher::new(pool, Arc::new(RoundRobin::new()), None);
        let response = dispatcher.dispatch(get_request(), None).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn backend_proxy_target_is_preserved() {
        let proxy = BackendProxy::new(Url::parse("http://localhost:9001").unwrap());
        assert_eq!(proxy.target().as_str(), "http://localhost:9001/");
    }
}
