//! HTTP client for the circulation REST backend
//!
//! - `config` - Base URL, timeouts and retry delay
//! - `api` - Typed requests with one retry on HTTP 500
//! - `wire` - JSON shapes specific to the backend
//! - `health` - Background liveness monitor

pub mod api;
pub mod config;
pub mod health;
pub mod wire;

pub use api::ApiClient;
pub use config::{ClientConfig, DEFAULT_BASE_URL};
pub use health::{HealthMonitor, HealthStatus};
