//! pedido-api: HTTP surface for pedido-gateway
//!
//! Exposes the order system's status webhook and a health check.

pub mod handlers;
pub mod routes;
pub mod server;

pub use server::{start_server, AppState};
