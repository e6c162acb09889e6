// Presentation layer - HTTP and websocket surface
pub mod app_state;
pub mod broadcast;
pub mod handlers;

use crate::presentation::app_state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(handlers::health_check))
        .route("/api/dashboard", get(handlers::get_dashboard))
        .route("/api/seed", post(handlers::seed))
        .route("/api/cleanup", post(handlers::cleanup))
        .route("/api/stats", get(handlers::stats))
        .route("/ws", get(broadcast::ws_dashboard))
        .with_state(state)
}
