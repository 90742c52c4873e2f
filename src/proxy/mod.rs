//! Backend Proxy: forwards one request to one backend URL and
//! classifies the outcome.
//!
//! # Responsibilities
//! - Forward a single request to the wrapped backend, writing the
//!   backend's response through unchanged on success.
//! - Classify the outcome as a success or a failure: a 5xx status or
//!   any transport-level error (connection refused, DNS failure,
//!   timeout, mid-stream I/O error) is a failure; everything else
//!   (including 4xx) is a success and is final.
//! - On a transport failure, synthesize the error response described in
//!   the proxy contract (504 for timeouts, 502 otherwise) so a caller
//!   that has exhausted every backend can use it directly.
//!
//! # Design Decisions
//! - The backend's response head (status + headers) is always fully
//!   resolved before any bytes reach the real client, because building
//!   the `axum::Response` the Dispatcher eventually returns only begins
//!   streaming once the handler future itself returns. A failing
//!   attempt therefore never "commits" partial output downstream — the
//!   §4.5 retry-safety edge case is structurally unreachable rather
//!   than something this code has to detect at runtime.
//! - No per-hop timeout is configurable from the outside (the core
//!   intentionally doesn't expose one); a conservative fixed deadline
//!   is still applied internally so that transport timeouts are
//!   distinguishable from other network errors, matching the original
//!   implementation's `net.Error.Timeout()` check.

use std::time::Duration;

use axum::body::Body;
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{Request, Response, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use url::Url;

/// Internal deadline applied to every backend attempt. Not configurable
/// from the outside — see module docs.
const BACKEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Why a forwarding attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The upstream call did not complete within the internal deadline.
    Timeout,
    /// A transport-level error other than a timeout (connection
    /// refused, DNS failure, mid-stream I/O error).
    Network,
    /// The backend answered with a 5xx status.
    UpstreamServerError(StatusCode),
}

/// The outcome of a failed `forward` call: classification plus a
/// ready-made response a caller may use verbatim.
#[derive(Debug)]
pub struct ProxyFailure {
    pub kind: FailureKind,
    pub response: Response<Body>,
}

/// Wraps a single backend URL and performs one hop of HTTP
/// reverse-proxying per call.
#[derive(Clone)]
pub struct BackendProxy {
    target: Url,
    client: Client<HttpConnector, Body>,
}

impl BackendProxy {
    pub fn new(target: Url) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { target, client }
    }

    /// The canonical backend URL this proxy forwards to.
    pub fn target(&self) -> &Url {
        &self.target
    }

    /// Forward `request` to the backend, returning the backend's
    /// response verbatim on success (including 4xx) or a classified
    /// failure otherwise.
    pub async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ProxyFailure> {
        let (parts, body) = request.into_parts();
        let uri = match self.rewrite_uri(&parts.uri) {
            Ok(uri) => uri,
            Err(_) => {
                return Err(ProxyFailure {
                    kind: FailureKind::Network,
                    response: error_response(
                        StatusCode::BAD_GATEWAY,
                        &format!("proxy error: invalid backend url {}", self.target),
                    ),
                })
            }
        };

        let mut builder = Request::builder().method(parts.method).uri(uri).version(parts.version);
        if let Some(headers) = builder.headers_mut() {
            *headers = parts.headers;
        }
        let req = match builder.body(body) {
            Ok(req) => req,
            Err(e) => {
                return Err(ProxyFailure {
                    kind: FailureKind::Network,
                    response: error_response(StatusCode::BAD_GATEWAY, &format!("proxy error: {e}")),
                })
            }
        };

        match tokio::time::timeout(BACKEND_TIMEOUT, self.client.request(req)).await {
            Err(_elapsed) => Err(ProxyFailure {
                kind: FailureKind::Timeout,
                response: error_response(StatusCode::GATEWAY_TIMEOUT, "server timeout"),
            }),
            Ok(Err(e)) => Err(ProxyFailure {
                kind: FailureKind::Network,
                response: error_response(StatusCode::BAD_GATEWAY, &format!("network error: {e}")),
            }),
            Ok(Ok(response)) => {
                let status = response.status();
                if status.is_server_error() {
                    Err(ProxyFailure {
                        kind: FailureKind::UpstreamServerError(status),
                        response: error_response(
                            StatusCode::BAD_GATEWAY,
                            &format!("proxy error: backend returned {status}"),
                        ),
                    })
                } else {
                    let (parts, body) = response.into_parts();
                    Ok(Response::from_parts(parts, Body::new(body)))
                }
            }
        }
    }

    /// Rewrite an incoming request URI to point at this backend,
    /// preserving the backend's path prefix and the request's path and
    /// query.
    fn rewrite_uri(&self, incoming: &Uri) -> Result<Uri, axum::http::Error> {
        let scheme = if self.target.scheme() == "https" {
            Scheme::HTTPS
        } else {
            Scheme::HTTP
        };

        let authority: Authority = self
            .target
            .host_str()
            .map(|host| match self.target.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            })
            .unwrap_or_default()
            .parse()
            .unwrap_or_else(|_| Authority::from_static("localhost"));

        let prefix = self.target.path().trim_end_matches('/');
        let suffix = incoming.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        let combined = format!("{prefix}{suffix}");
        let path_and_query: PathAndQuery = combined.parse().unwrap_or_else(|_| PathAndQuery::from_static("/"));

        Uri::builder()
            .scheme(scheme)
            .authority(authority)
            .path_and_query(path_and_query)
            .build()
    }
}

fn error_response(status: StatusCode, body: &str) -> Response<Body> {
    Response::builder()
        .status(status)
        .body(Body::from(body.to_string()))
        .expect("static error response is always valid")
}
