//! HTTP server setup: wires the Dispatcher into an Axum router and
//! serves it with graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::admin;
use crate::dispatcher::Dispatcher;
use crate::security::rate_limit::Limiter;

/// HTTP server for the reverse proxy.
pub struct HttpServer {
    dispatcher: Arc<Dispatcher>,
    limiter: Option<Arc<Limiter>>,
}

impl HttpServer {
    pub fn new(dispatcher: Arc<Dispatcher>, limiter: Option<Arc<Limiter>>) -> Self {
        Self { dispatcher, limiter }
    }

    fn router(&self) -> Router {
        let data_plane = Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(self.dispatcher.clone());

        match &self.limiter {
            Some(limiter) => data_plane.merge(admin::router(limiter.clone())),
            None => data_plane,
        }
    }

    /// Serve on `listener` until `shutdown` fires, then drain in-flight
    /// handlers for up to 5 seconds before returning.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();

        let mut drain_trigger = shutdown.resubscribe();
        let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server draining in-flight requests");
        });
        tokio::pin!(serve);

        tokio::select! {
            result = &mut serve => result?,
            _ = drain_trigger.recv() => {
                match tokio::time::timeout(std::time::Duration::from_secs(5), serve).await {
                    Ok(result) => result?,
                    Err(_elapsed) => tracing::warn!("graceful shutdown deadline exceeded, forcing close"),
                }
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn proxy_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request<Body>,
) -> impl IntoResponse {
    let remote_addr = connect_info.map(|ConnectInfo(addr)| addr);
    dispatcher.dispatch(request, remote_addr).await
}
