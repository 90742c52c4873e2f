//! Rust reverse-proxy load balancer library.

pub mod admin;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod proxy;
pub mod security;

pub use config::schema::AppConfig;
pub use dispatcher::Dispatcher;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
