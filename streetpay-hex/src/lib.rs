//! # Streetpay Hex
//!
//! Application service and inbound HTTP adapter for the settlement engine.
//! The service orchestrates the repository and payment provider ports; the
//! inbound module exposes it over HTTP.

pub mod inbound;
pub mod openapi;
pub mod service;

#[cfg(test)]
mod service_tests;

pub use service::OrderService;
