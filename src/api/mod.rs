//! Operational HTTP endpoints (health, stats, metrics).
//!
//! The gateway's application surface is the WebSocket event contract; these
//! routes exist for monitoring only.

mod health;
mod metrics;
mod routes;

pub use health::{health, stats};
pub use metrics::prometheus_metrics;
pub use routes::api_routes;
