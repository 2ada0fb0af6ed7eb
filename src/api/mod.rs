//! HTTP surface of the synthesis service.

mod error;
mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::scheduler::JobScheduler;

/// Shared application state available to all handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<JobScheduler>,
    /// Prefix for absolute download URLs in job views.
    pub public_base_url: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/synthesize", post(handlers::synthesize))
        .route("/download/{task_id}", get(handlers::download))
        .route("/status/{task_id}", get(handlers::status))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
