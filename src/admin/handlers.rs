//! Admin request/response bodies and handler functions for `/clients`.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::error::LimiterError;
use crate::security::rate_limit::Limiter;

#[derive(Deserialize)]
pub struct RegisterClientRequest {
    pub ip: String,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default, with = "humantime_serde::option")]
    pub refill_every: Option<Duration>,
}

#[derive(Deserialize)]
pub struct RemoveClientRequest {
    pub ip: String,
}

/// `POST /clients`.
pub async fn register_client(
    State(limiter): State<Arc<Limiter>>,
    body: Result<Json<RegisterClientRequest>, axum::extract::rejection::JsonRejection>,
) -> (StatusCode, String) {
    let Json(req) = match body {
        Ok(json) => json,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()),
    };

    let ip: IpAddr = match req.ip.parse() {
        Ok(ip) => ip,
        Err(e) => return (StatusCode::BAD_REQUEST, format!("invalid ip: {e}")),
    };

    // Both fields are required at the HTTP boundary, even though the
    // internal `Limiter::set_client` accepts `None` and substitutes its
    // own defaults — the admin API contract (spec §6) has no defaults.
    let capacity = match req.capacity {
        Some(c) if c > 0 => c,
        _ => return (StatusCode::BAD_REQUEST, "missing or invalid fields".to_string()),
    };
    let refill_every = match req.refill_every {
        Some(d) => d,
        None => return (StatusCode::BAD_REQUEST, "missing or invalid fields".to_string()),
    };

    match limiter.set_client(ip, Some(capacity), Some(refill_every)).await {
        Ok(()) => (StatusCode::CREATED, String::new()),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// `DELETE /clients`.
pub async fn remove_client(
    State(limiter): State<Arc<Limiter>>,
    body: Result<Json<RemoveClientRequest>, axum::extract::rejection::JsonRejection>,
) -> (StatusCode, String) {
    let Json(req) = match body {
        Ok(json) => json,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()),
    };

    let ip: IpAddr = match req.ip.parse() {
        Ok(ip) => ip,
        Err(e) => return (StatusCode::BAD_REQUEST, format!("invalid ip: {e}")),
    };

    match limiter.remove_client(ip).await {
        Ok(()) => (StatusCode::OK, String::new()),
        Err(LimiterError::RemoveIp(e)) => (StatusCode::NOT_FOUND, e),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}
