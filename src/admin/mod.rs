//! Admin HTTP API: client registration for the rate limiter. Mounted
//! on the same listener as the data plane, only when `--rlimit` is set.
//! No additional authentication layer is specified — the admin surface
//! shares the data plane's trust boundary.

pub mod handlers;

use std::sync::Arc;

use axum::routing::{delete, post};
use axum::Router;

use self::handlers::{register_client, remove_client};
use crate::security::rate_limit::Limiter;

pub fn router(limiter: Arc<Limiter>) -> Router {
    Router::new()
        .route("/clients", post(register_client).delete(remove_client))
        .with_state(limiter)
}
