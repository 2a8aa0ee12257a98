//! HTTP API handlers
//!
//! The order-status webhook and the health check.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::{info, warn};

use pedido_whatsapp::{DispatchError, StatusRequest};

use crate::server::AppState;

/// Webhook response payload
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// Order-status webhook: relay an update to the customer
pub async fn order_status(
    State(state): State<AppState>,
    Json(request): Json<StatusRequest>,
) -> (StatusCode, Json<StatusResponse>) {
    info!("Order-status webhook received: {:?}", request.status);

    match state.dispatcher.handle_status_update(&request).await {
        Ok(()) => (
            StatusCode::OK,
            Json(StatusResponse {
                ok: true,
                error: None,
            }),
        ),
        Err(e) => {
            warn!("Order-status update rejected: {}", e);
            (
                status_for(&e),
                Json(StatusResponse {
                    ok: false,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

/// Map a dispatch failure to an HTTP status.
fn status_for(error: &DispatchError) -> StatusCode {
    match error {
        DispatchError::MissingFields | DispatchError::InvalidStatus => StatusCode::BAD_REQUEST,
        DispatchError::NotConnected => StatusCode::SERVICE_UNAVAILABLE,
        DispatchError::DeliveryFailed => StatusCode::BAD_GATEWAY,
    }
}
