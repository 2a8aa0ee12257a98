//! First-contact greeter
//!
//! Sends the two-part greeting (welcome, then the menu link) to every
//! contact whose first message arrives while the process is up.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use tracing::{info, warn};

use pedido_core::GreetingTexts;

use crate::error::{Result, WhatsAppError};
use crate::socket::OutboundSender;
use crate::supervisor::SharedHandle;
use crate::types::{InboundMessage, Jid};

/// Contacts that already received the greeting sequence.
///
/// Append-only for the process lifetime and never persisted; insertion
/// doubles as the atomic dedup check.
#[derive(Clone, Default)]
pub struct SeenContacts {
    inner: Arc<DashSet<Jid>>,
}

impl SeenContacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a contact as greeted. Returns false when it was already marked.
    pub fn check_and_insert(&self, jid: &Jid) -> bool {
        self.inner.insert(jid.clone())
    }

    pub fn contains(&self, jid: &Jid) -> bool {
        self.inner.contains(jid)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Greets each new individual contact at most once per process lifetime.
pub struct Greeter {
    handle: SharedHandle,
    seen: SeenContacts,
    texts: GreetingTexts,
    pause: Duration,
}

impl Greeter {
    pub fn new(
        handle: SharedHandle,
        seen: SeenContacts,
        texts: GreetingTexts,
        pause: Duration,
    ) -> Self {
        Self {
            handle,
            seen,
            texts,
            pause,
        }
    }

    /// Process one delivered batch of inbound messages.
    ///
    /// Every message of the batch is considered, so several new senders in
    /// a single batch each get their greeting. Delivery failures are logged
    /// and swallowed; the contact stays marked either way, so a greeting is
    /// never retried.
    pub async fn handle_batch(&self, batch: &[InboundMessage]) {
        for message in batch {
            if message.from_me {
                continue;
            }
            if !message.has_content() {
                continue;
            }
            if !message.sender.is_individual() {
                continue;
            }
            // Mark before sending so a concurrent duplicate event for the
            // same sender cannot double-greet.
            if !self.seen.check_and_insert(&message.sender) {
                continue;
            }

            info!("First contact from {}", message.sender);

            if let Err(e) = self.send_greeting(&message.sender).await {
                warn!("Greeting delivery to {} failed: {}", message.sender, e);
            }
        }
    }

    async fn send_greeting(&self, to: &Jid) -> Result<()> {
        let session = self
            .handle
            .current()
            .await
            .ok_or(WhatsAppError::SessionClosed)?;

        session.send_text(to, &self.texts.welcome).await?;
        tokio::time::sleep(self.pause).await;
        session.send_text(to, &self.texts.menu).await?;

        info!("Greeting and menu sent to {}", to);
        Ok(())
    }
}
