//! HTTP API for commercial cutting.
//!
//! This crate provides:
//! - YAML plus environment configuration
//! - The `/comskip` submission and `/status` endpoints
//! - Request id, logging and Prometheus middleware

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::{ApiConfig, ConfigError, Settings};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
