//! Order-status notification dispatch
//!
//! Validates status updates pushed by the order system, composes the
//! customer-facing text and performs exactly one send through the current
//! session.

use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use pedido_core::{compose_status_message, OrderStatus};

use crate::socket::OutboundSender;
use crate::supervisor::SharedHandle;
use crate::types::Jid;

/// Status update pushed by the order system.
///
/// Wire field names follow the order system's contract; everything is
/// optional at the serde layer so validation can answer with a proper
/// error instead of a deserialization failure.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusRequest {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "cliente")]
    pub customer: Option<Customer>,
    #[serde(default, rename = "pedido")]
    pub order: Option<OrderRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    #[serde(default, rename = "telefone")]
    pub phone: Option<String>,
    #[serde(default, rename = "nome")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderRef {
    #[serde(default, rename = "numero")]
    pub number: Option<String>,
}

/// Why a status update was not delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("transport not connected")]
    NotConnected,

    #[error("missing required fields")]
    MissingFields,

    #[error("invalid status")]
    InvalidStatus,

    /// Transport-level failure; the detail stays in the logs
    #[error("delivery failed")]
    DeliveryFailed,
}

/// Sends order-status notifications through the live session.
///
/// Performs no deduplication: repeated identical requests produce
/// repeated sends, by contract with the order system.
#[derive(Clone)]
pub struct NotificationDispatcher {
    handle: SharedHandle,
}

impl NotificationDispatcher {
    pub fn new(handle: SharedHandle) -> Self {
        Self { handle }
    }

    /// Validate and deliver one status update.
    pub async fn handle_status_update(&self, request: &StatusRequest) -> Result<(), DispatchError> {
        let Some(session) = self.handle.current().await else {
            return Err(DispatchError::NotConnected);
        };

        let status_code = request.status.as_deref().unwrap_or("");
        let phone = request
            .customer
            .as_ref()
            .and_then(|c| c.phone.as_deref())
            .unwrap_or("");
        if status_code.is_empty() || phone.is_empty() {
            return Err(DispatchError::MissingFields);
        }

        let status = OrderStatus::from_code(status_code).ok_or(DispatchError::InvalidStatus)?;

        let to = Jid::from_phone(phone);
        let name = request
            .customer
            .as_ref()
            .and_then(|c| c.name.as_deref())
            .filter(|n| !n.is_empty());
        let number = request
            .order
            .as_ref()
            .and_then(|o| o.number.as_deref())
            .filter(|n| !n.is_empty());
        let body = compose_status_message(status, name, number);

        match session.send_text(&to, &body).await {
            Ok(()) => {
                info!("Status {} sent to {}", status.code(), to);
                Ok(())
            }
            Err(e) => {
                // full detail stays internal; the caller gets a generic failure
                error!("Status delivery to {} failed: {}", to, e);
                Err(DispatchError::DeliveryFailed)
            }
        }
    }
}
