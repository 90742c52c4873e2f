//! Configuration schema definitions.
//!
//! The proxy reads a single YAML document that carries two independent
//! sections: the backend URL list (`servers:`) and the rate limiter
//! defaults (`rate_limiter:`). They are modeled as separate structs so
//! each can be deserialized from the same document in isolation —
//! unknown top-level keys are ignored by `serde_yaml` by default.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The `servers:` section: the list of backend URLs the pool should
/// converge to on load or reload.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BackendList {
    /// Absolute backend URLs, e.g. `http://localhost:9001`.
    #[serde(default)]
    pub servers: Vec<String>,
}

/// The `rate_limiter:` section.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RateLimiterSection {
    #[serde(default)]
    pub rate_limiter: RateLimiterDefaults,
}

/// Defaults substituted for a client registered without explicit
/// capacity/refill parameters.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimiterDefaults {
    pub default_capacity: u32,
    #[serde(with = "humantime_serde")]
    pub default_refill_rate: Duration,
}

impl Default for RateLimiterDefaults {
    fn default() -> Self {
        Self {
            default_capacity: 10,
            default_refill_rate: Duration::from_secs(1),
        }
    }
}

/// Fully loaded and validated application configuration for one reload
/// cycle. Immutable once built; a reload produces a fresh value rather
/// than mutating this one in place.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub servers: Vec<String>,
    pub rate_limiter: RateLimiterDefaults,
}
