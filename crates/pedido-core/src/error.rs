//! Error types for pedido-core

use thiserror::Error;

/// Main error type for pedido-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for pedido-core
pub type Result<T> = std::result::Result<T, Error>;
