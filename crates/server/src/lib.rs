//! HTTP surface and process wiring for the exemption service.
//!
//! Exposes the profile save route, the secured certificate download route,
//! and a health probe, plus the daily expiration sweep on a cron schedule.

pub mod api;
pub mod config;
pub mod error;
pub mod schedule;
pub mod telemetry;
pub mod token;

pub use config::ServerConfig;
pub use error::ServerError;
