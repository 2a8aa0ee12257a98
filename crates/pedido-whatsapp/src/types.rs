//! WhatsApp transport types
//!
//! Wire envelopes exchanged with the bridge socket and the typed events
//! consumed by the supervisor.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::auth::AuthState;

/// Address of a messaging-network participant (jid).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Jid(String);

impl Jid {
    const INDIVIDUAL_SUFFIX: &'static str = "@s.whatsapp.net";

    /// Derive a customer's jid from a phone number.
    pub fn from_phone(phone: &str) -> Self {
        Self(format!("{}{}", phone, Self::INDIVIDUAL_SUFFIX))
    }

    /// Wrap a raw jid string as received from the bridge.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Whether this address is an individual contact, as opposed to a
    /// group or broadcast address.
    pub fn is_individual(&self) -> bool {
        self.0.ends_with(Self::INDIVIDUAL_SUFFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One record of an inbound message batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Sender address
    pub sender: Jid,
    /// Whether the bot account itself originated the message
    #[serde(default)]
    pub from_me: bool,
    /// Text content; absent for protocol and system events
    #[serde(default)]
    pub text: Option<String>,
}

impl InboundMessage {
    /// Whether the record carries actual content.
    pub fn has_content(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

/// Bridge status code that marks the session as revoked.
pub(crate) const LOGGED_OUT_STATUS: u16 = 401;

/// Close reason reported for a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The credentials were explicitly invalidated; reconnecting with them
    /// can never succeed
    LoggedOut,
    /// Transient loss (network error, server restart, ...)
    ConnectionLost { status_code: Option<u16> },
}

impl DisconnectReason {
    pub fn from_status_code(status_code: Option<u16>) -> Self {
        match status_code {
            Some(LOGGED_OUT_STATUS) => Self::LoggedOut,
            other => Self::ConnectionLost { status_code: other },
        }
    }

    pub fn is_logged_out(&self) -> bool {
        matches!(self, Self::LoggedOut)
    }
}

/// Event delivered on a session's event channel.
///
/// Each connection gets a fresh channel; events of one connection arrive
/// in order and never mix with a later session's.
#[derive(Debug)]
pub enum TransportEvent {
    /// The connection reached the open state
    Connected,
    /// A delivered batch of inbound messages
    Messages(Vec<InboundMessage>),
    /// The bridge rotated the credential state
    CredsRotated(AuthState),
    /// The connection closed; always the last event of a session
    Disconnected(DisconnectReason),
}

/// JSON envelope received from the bridge socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum WireEnvelope {
    ConnectionUpdate {
        state: WireConnectionState,
        #[serde(default)]
        status_code: Option<u16>,
    },
    MessageBatch {
        messages: Vec<InboundMessage>,
    },
    CredsUpdate {
        creds: serde_json::Value,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum WireConnectionState {
    Connecting,
    Open,
    Close,
}

/// Frame sent to the bridge socket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum WireCommand<'a> {
    /// Restore a session from persisted credentials
    Restore { creds: Option<&'a serde_json::Value> },
    /// Deliver a text message
    Send { to: &'a str, text: &'a str },
}
