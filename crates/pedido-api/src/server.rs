//! HTTP API server
//!
//! Starts and manages the axum-based webhook server.

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use pedido_whatsapp::NotificationDispatcher;

use crate::routes::routes;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<NotificationDispatcher>,
}

/// Start the webhook HTTP server
pub async fn start_server(port: u16, dispatcher: NotificationDispatcher) -> anyhow::Result<()> {
    let state = AppState {
        dispatcher: Arc::new(dispatcher),
    };

    let app = Router::new()
        .merge(routes())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Webhook HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
