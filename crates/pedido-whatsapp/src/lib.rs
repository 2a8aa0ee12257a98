//! pedido-whatsapp: WhatsApp session and delivery orchestration
//!
//! This crate owns the connection to the WhatsApp bridge: the transport
//! session, the reconnection supervisor, the first-contact greeter and the
//! order-status notification dispatcher.

pub mod auth;
pub mod dispatch;
pub mod error;
pub mod greeter;
pub mod socket;
pub mod supervisor;
pub mod types;

pub use auth::{AuthState, FileAuthStore};
pub use dispatch::{DispatchError, NotificationDispatcher, StatusRequest};
pub use error::{Result, WhatsAppError};
pub use greeter::{Greeter, SeenContacts};
pub use socket::{Connect, OutboundSender, SessionChannel, SessionHandle, SocketTransport};
pub use supervisor::{SharedHandle, Supervisor};
pub use types::{DisconnectReason, InboundMessage, Jid, TransportEvent};
