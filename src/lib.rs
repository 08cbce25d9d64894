//! liveops - lifecycle automation for live streaming channels
//!
//! This library crate exposes the configuration loader, application context
//! and HTTP router for the binary and for integration testing.

pub mod config;
pub mod context;
pub mod server;
