//! WebSocket transport session against the WhatsApp bridge
//!
//! The bridge multiplexes connection-state updates, inbound message
//! batches and credential rotations over a single socket; outbound sends
//! travel the same socket as `send` frames. Each established connection
//! runs one session task and feeds one fresh event channel.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::auth::AuthState;
use crate::error::{Result, WhatsAppError};
use crate::types::{
    DisconnectReason, Jid, TransportEvent, WireCommand, WireConnectionState, WireEnvelope,
};

const EVENT_CHANNEL_CAPACITY: usize = 64;
const COMMAND_CHANNEL_CAPACITY: usize = 32;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, WsMessage>;

/// Sender half of a live session.
#[async_trait]
pub trait OutboundSender: Send + Sync {
    /// Deliver a text message to a contact.
    async fn send_text(&self, to: &Jid, text: &str) -> Result<()>;
}

/// Establishes transport sessions.
///
/// The seam between the supervisor and the wire protocol; tests substitute
/// a scripted implementation.
#[async_trait]
pub trait Connect: Send + Sync {
    async fn connect(&self, auth: Option<AuthState>) -> Result<SessionChannel>;
}

/// A freshly established session: its sender plus the event channel that
/// lives exactly as long as the connection.
pub struct SessionChannel {
    pub handle: Arc<dyn OutboundSender>,
    pub events: mpsc::Receiver<TransportEvent>,
}

struct OutboundCommand {
    to: Jid,
    text: String,
    done: oneshot::Sender<Result<()>>,
}

/// Handle for sending through a live socket session.
///
/// Cheap to clone; all clones share the session's command channel. Once
/// the session task is gone every send fails with `SessionClosed`.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<OutboundCommand>,
    send_timeout: Duration,
}

#[async_trait]
impl OutboundSender for SessionHandle {
    async fn send_text(&self, to: &Jid, text: &str) -> Result<()> {
        let (done, ack) = oneshot::channel();
        let command = OutboundCommand {
            to: to.clone(),
            text: text.to_string(),
            done,
        };

        self.commands
            .send(command)
            .await
            .map_err(|_| WhatsAppError::SessionClosed)?;

        match tokio::time::timeout(self.send_timeout, ack).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(WhatsAppError::SessionClosed),
            Err(_) => Err(WhatsAppError::SendTimeout),
        }
    }
}

/// `Connect` implementation backed by the bridge WebSocket.
pub struct SocketTransport {
    url: String,
    send_timeout: Duration,
}

impl SocketTransport {
    pub fn new(url: &str, send_timeout: Duration) -> Self {
        Self {
            url: url.to_string(),
            send_timeout,
        }
    }
}

#[async_trait]
impl Connect for SocketTransport {
    async fn connect(&self, auth: Option<AuthState>) -> Result<SessionChannel> {
        info!("Connecting to WhatsApp bridge at {}", self.url);

        let (mut ws_stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| WhatsAppError::Connect(e.to_string()))?;

        // The first frame restores the previous session, if one was persisted.
        if auth.is_none() {
            debug!("No stored credentials; the bridge will start a fresh pairing");
        }
        let restore = WireCommand::Restore {
            creds: auth.as_ref().map(|state| &state.0),
        };
        let frame =
            serde_json::to_string(&restore).map_err(|e| WhatsAppError::Connect(e.to_string()))?;
        ws_stream
            .send(WsMessage::Text(frame.into()))
            .await
            .map_err(|e| WhatsAppError::Connect(e.to_string()))?;

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

        tokio::spawn(session_loop(ws_stream, command_rx, event_tx));

        let handle = SessionHandle {
            commands: command_tx,
            send_timeout: self.send_timeout,
        };

        Ok(SessionChannel {
            handle: Arc::new(handle),
            events: event_rx,
        })
    }
}

/// Drive one connection until it closes.
///
/// Emits `Disconnected` as the final event of the session and then
/// returns; pending senders observe the dropped ack channel.
async fn session_loop(
    ws_stream: WsStream,
    mut commands: mpsc::Receiver<OutboundCommand>,
    events: mpsc::Sender<TransportEvent>,
) {
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            maybe_command = commands.recv() => {
                let Some(command) = maybe_command else {
                    // every handle is gone; tear the session down
                    break;
                };
                if !forward_command(&mut write, command).await {
                    lost(&events, None).await;
                    break;
                }
            }
            maybe_frame = read.next() => {
                if !handle_frame(maybe_frame, &mut write, &events).await {
                    break;
                }
            }
        }
    }
}

/// Serialize one outbound command onto the socket and ack it.
///
/// Returns false when the socket write failed and the session is over.
async fn forward_command(write: &mut WsWriter, command: OutboundCommand) -> bool {
    let frame = WireCommand::Send {
        to: command.to.as_str(),
        text: &command.text,
    };

    let result = match serde_json::to_string(&frame) {
        Ok(json) => write
            .send(WsMessage::Text(json.into()))
            .await
            .map_err(|e| WhatsAppError::Socket(e.to_string())),
        Err(e) => Err(WhatsAppError::Socket(e.to_string())),
    };

    let delivered = result.is_ok();
    if let Err(ref e) = result {
        error!("Outbound send failed: {}", e);
    }
    // the sender may have timed out and dropped the ack receiver
    let _ = command.done.send(result);

    delivered
}

/// Route one inbound socket frame.
///
/// Returns false when the connection is over and the loop should stop.
async fn handle_frame(
    maybe_frame: Option<std::result::Result<WsMessage, tokio_tungstenite::tungstenite::Error>>,
    write: &mut WsWriter,
    events: &mpsc::Sender<TransportEvent>,
) -> bool {
    match maybe_frame {
        Some(Ok(WsMessage::Text(text))) => {
            match serde_json::from_str::<WireEnvelope>(&text) {
                Ok(WireEnvelope::ConnectionUpdate {
                    state: WireConnectionState::Open,
                    ..
                }) => {
                    let _ = events.send(TransportEvent::Connected).await;
                }
                Ok(WireEnvelope::ConnectionUpdate {
                    state: WireConnectionState::Connecting,
                    ..
                }) => {
                    debug!("Bridge connection in progress");
                }
                Ok(WireEnvelope::ConnectionUpdate {
                    state: WireConnectionState::Close,
                    status_code,
                }) => {
                    let reason = DisconnectReason::from_status_code(status_code);
                    info!("Bridge reported close: {:?}", reason);
                    let _ = events.send(TransportEvent::Disconnected(reason)).await;
                    return false;
                }
                Ok(WireEnvelope::MessageBatch { messages }) => {
                    debug!("Received batch of {} messages", messages.len());
                    let _ = events.send(TransportEvent::Messages(messages)).await;
                }
                Ok(WireEnvelope::CredsUpdate { creds }) => {
                    let _ = events
                        .send(TransportEvent::CredsRotated(AuthState(creds)))
                        .await;
                }
                Err(e) => {
                    warn!("Skipping malformed frame: {}", e);
                }
            }
            true
        }
        Some(Ok(WsMessage::Ping(data))) => {
            if write.send(WsMessage::Pong(data)).await.is_err() {
                lost(events, None).await;
                return false;
            }
            true
        }
        Some(Ok(WsMessage::Close(frame))) => {
            let status_code = frame.map(|f| u16::from(f.code));
            let reason = DisconnectReason::from_status_code(status_code);
            info!("Bridge socket closed: {:?}", reason);
            let _ = events.send(TransportEvent::Disconnected(reason)).await;
            false
        }
        Some(Ok(_)) => true,
        Some(Err(e)) => {
            error!("Socket error: {}", e);
            lost(events, None).await;
            false
        }
        None => {
            lost(events, None).await;
            false
        }
    }
}

async fn lost(events: &mpsc::Sender<TransportEvent>, status_code: Option<u16>) {
    let _ = events
        .send(TransportEvent::Disconnected(
            DisconnectReason::ConnectionLost { status_code },
        ))
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle_with(
        commands: mpsc::Sender<OutboundCommand>,
        send_timeout: Duration,
    ) -> SessionHandle {
        SessionHandle {
            commands,
            send_timeout,
        }
    }

    #[tokio::test]
    async fn test_send_against_torn_down_session_fails_cleanly() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let handle = handle_with(tx, Duration::from_secs(1));
        let result = handle
            .send_text(&Jid::from_phone("5511999999999"), "oi")
            .await;

        assert!(matches!(result, Err(WhatsAppError::SessionClosed)));
    }

    #[tokio::test]
    async fn test_dropped_ack_reports_session_closed() {
        let (tx, mut rx) = mpsc::channel::<OutboundCommand>(1);
        tokio::spawn(async move {
            let command = rx.recv().await.unwrap();
            drop(command.done);
        });

        let handle = handle_with(tx, Duration::from_secs(1));
        let result = handle
            .send_text(&Jid::from_phone("5511999999999"), "oi")
            .await;

        assert!(matches!(result, Err(WhatsAppError::SessionClosed)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_is_bounded_by_timeout() {
        let (tx, mut rx) = mpsc::channel::<OutboundCommand>(1);
        // hold the command without acking so the sender has to give up
        let held = tokio::spawn(async move {
            let command = rx.recv().await;
            std::future::pending::<()>().await;
            drop(command);
        });

        let handle = handle_with(tx, Duration::from_secs(30));
        let result = handle
            .send_text(&Jid::from_phone("5511999999999"), "oi")
            .await;

        assert!(matches!(result, Err(WhatsAppError::SendTimeout)));
        held.abort();
    }

    #[tokio::test]
    async fn test_acked_send_succeeds() {
        let (tx, mut rx) = mpsc::channel::<OutboundCommand>(1);
        tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                assert_eq!(command.to.as_str(), "5511999999999@s.whatsapp.net");
                let _ = command.done.send(Ok(()));
            }
        });

        let handle = handle_with(tx, Duration::from_secs(1));
        let result = handle
            .send_text(&Jid::from_phone("5511999999999"), "oi")
            .await;

        assert!(result.is_ok());
    }
}
