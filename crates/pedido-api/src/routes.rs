//! Route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{health, order_status};
use crate::server::AppState;

/// Create the API router
pub fn routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health))
        // Order-status webhook
        .route("/pedido", post(order_status))
}
