//! Data-access core for the atlas content-browsing client.
//!
//! Wraps the remote places API behind an authenticated HTTP client that
//! transparently refreshes an expired bearer credential (single-flight
//! across concurrent failures) and a shared TTL response cache.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod store;
