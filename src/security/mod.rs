//! Security subsystem: per-client admission control.
//!
//! # Data Flow
//! ```text
//! Incoming request (when the limiter is enabled):
//!     → extract client IP from remote address
//!     → rate_limit.rs (Limiter::allow)
//!     → 429 on denial, otherwise continue to the dispatcher's
//!       select/forward loop
//! ```

pub mod rate_limit;
pub mod registry;
