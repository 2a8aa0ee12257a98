//! pedido-core: shared building blocks for pedido-gateway
//!
//! Configuration, error types, the order-status catalog and the
//! customer-facing message texts used by the WhatsApp bridge.

pub mod catalog;
pub mod config;
pub mod error;

pub use catalog::{compose_status_message, GreetingTexts, OrderStatus};
pub use config::{ApiConfig, BotConfig, Config, WhatsAppConfig};
pub use error::{Error, Result};
