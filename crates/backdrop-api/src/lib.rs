//! Axum HTTP API server.
//!
//! This crate provides:
//! - Background removal and compositing endpoints
//! - Generative restyling with logo branding
//! - Wipe transition videos returned as data URLs
//! - Rate limiting, security headers and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::PipelineService;
pub use state::AppState;
