//! Error types for pedido-whatsapp

use thiserror::Error;

/// pedido-whatsapp error type
#[derive(Error, Debug)]
pub enum WhatsAppError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Socket error: {0}")]
    Socket(String),

    #[error("Session closed")]
    SessionClosed,

    #[error("Send timed out")]
    SendTimeout,

    #[error("Credential store error: {0}")]
    Auth(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, WhatsAppError>;
