//! HTTP route handlers for the relay.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health              - Health check
//! POST /slack/interactions  - Interactive component payloads (button clicks)
//! POST /slack/events        - Events API (URL verification, App Home)
//! ```

use axum::{Router, routing::get};

use crate::state::AppState;

pub mod slack;

/// Build the application router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(slack::router())
}

/// Liveness check.
async fn health() -> &'static str {
    "ok"
}
