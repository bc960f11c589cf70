//! Metrics HTTP endpoint.
//!
//! Serves the Prometheus registry over axum.

pub mod routes;

pub use routes::{build_router, serve, AppState};
