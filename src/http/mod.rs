//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum router: data plane + optional admin plane)
//!     → dispatcher.rs (Dispatcher::dispatch)
//!     → [load balancer selects and forwards]
//!     → response streamed back to the client
//! ```

pub mod server;

pub use server::HttpServer;
