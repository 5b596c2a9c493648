//! Inbound HTTP adapter: routing, handlers, and middleware.

mod auth;
pub mod handlers;
mod rate_limit;
mod server;

pub use server::HttpServer;
