//! Configuration validation logic.
//!
//! Separates syntactic checks (handled by `serde` during parsing) from
//! semantic ones: every backend must be an absolute `http`/`https` URL,
//! and rate limiter defaults must be strictly positive.

use std::time::Duration;

use url::Url;

use crate::config::schema::{AppConfig, BackendList, RateLimiterDefaults};

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError(pub String);

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "validation error: {}", self.0)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a freshly parsed backend list, returning the canonical URL
/// strings on success.
pub fn validate_backends(backends: &BackendList) -> Result<Vec<String>, Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut urls = Vec::with_capacity(backends.servers.len());

    for raw in &backends.servers {
        match Url::parse(raw) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
                urls.push(url.to_string());
            }
            Ok(url) => errors.push(ValidationError(format!(
                "backend '{raw}' has unsupported scheme '{}'",
                url.scheme()
            ))),
            Err(e) => errors.push(ValidationError(format!("backend '{raw}' is not a valid url: {e}"))),
        }
    }

    if errors.is_empty() {
        Ok(urls)
    } else {
        Err(errors)
    }
}

/// Validate rate limiter defaults.
pub fn validate_rate_limiter(defaults: &RateLimiterDefaults) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if defaults.default_capacity == 0 {
        errors.push(ValidationError(
            "rate_limiter.default_capacity must be > 0".to_string(),
        ));
    }
    if defaults.default_refill_rate == Duration::ZERO {
        errors.push(ValidationError(
            "rate_limiter.default_refill_rate must be > 0".to_string(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a fully assembled configuration in one pass.
pub fn validate_config(
    backends: &BackendList,
    rate_limiter: &RateLimiterDefaults,
) -> Result<AppConfig, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let servers = match validate_backends(backends) {
        Ok(servers) => servers,
        Err(e) => {
            errors.extend(e);
            Vec::new()
        }
    };

    if let Err(e) = validate_rate_limiter(rate_limiter) {
        errors.extend(e);
    }

    if errors.is_empty() {
        Ok(AppConfig {
            servers,
            rate_limiter: *rate_limiter,
        })
    } else {
        Err(errors)
    }
}
