//! Reconnection supervisor
//!
//! Owns the single live session: establishes it, replaces the shared
//! handle on every reconnect and stops for good when the bridge reports
//! the session as revoked.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::auth::FileAuthStore;
use crate::error::Result;
use crate::greeter::Greeter;
use crate::socket::{Connect, OutboundSender, SessionChannel};
use crate::types::TransportEvent;

/// Live reference to the current session's sender, or absent.
///
/// Written only by the supervisor; read by the greeter and the
/// dispatcher. Readers must tolerate the handle being absent or going
/// stale between the read and the send.
#[derive(Clone, Default)]
pub struct SharedHandle {
    inner: Arc<RwLock<Option<Arc<dyn OutboundSender>>>>,
}

impl SharedHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current session sender, if a session is live.
    pub async fn current(&self) -> Option<Arc<dyn OutboundSender>> {
        self.inner.read().await.clone()
    }

    pub(crate) async fn replace(&self, handle: Option<Arc<dyn OutboundSender>>) {
        *self.inner.write().await = handle;
    }
}

/// How a session ended.
enum SessionEnd {
    /// Credentials were revoked; reconnecting with them can never succeed
    LoggedOut,
    /// Transient loss; a new session may be attempted
    Dropped,
}

/// Restarts the transport session until the credentials are revoked.
pub struct Supervisor<C> {
    transport: C,
    handle: SharedHandle,
    greeter: Greeter,
    auth_store: FileAuthStore,
    reconnect_delay: Duration,
}

impl<C: Connect> Supervisor<C> {
    pub fn new(
        transport: C,
        handle: SharedHandle,
        greeter: Greeter,
        auth_store: FileAuthStore,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            transport,
            handle,
            greeter,
            auth_store,
            reconnect_delay,
        }
    }

    /// Run the supervision loop.
    ///
    /// Intended as a singleton task. Every failure short of a logged-out
    /// signal, including failures before any connection event fires,
    /// schedules a fresh session after the fixed reconnect delay.
    pub async fn run(self) {
        loop {
            match self.run_session().await {
                Ok(SessionEnd::LoggedOut) => {
                    error!(
                        "Session revoked by the messaging network; \
                         re-authentication required"
                    );
                    break;
                }
                Ok(SessionEnd::Dropped) => {
                    warn!(
                        "Connection lost; reconnecting in {}s",
                        self.reconnect_delay.as_secs()
                    );
                }
                Err(e) => {
                    error!(
                        "Failed to establish session: {}; retrying in {}s",
                        e,
                        self.reconnect_delay.as_secs()
                    );
                }
            }

            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    async fn run_session(&self) -> Result<SessionEnd> {
        let auth = self.auth_store.load()?;
        let SessionChannel { handle, mut events } = self.transport.connect(auth).await?;

        self.handle.replace(Some(handle)).await;

        let end = loop {
            let Some(event) = events.recv().await else {
                // channel ended without a close event; treat as a drop
                break SessionEnd::Dropped;
            };

            match event {
                TransportEvent::Connected => {
                    info!("WhatsApp connection open");
                }
                TransportEvent::Messages(batch) => {
                    self.greeter.handle_batch(&batch).await;
                }
                TransportEvent::CredsRotated(state) => {
                    if let Err(e) = self.auth_store.save(&state) {
                        error!("Failed to persist rotated credentials: {}", e);
                    }
                }
                TransportEvent::Disconnected(reason) => {
                    break if reason.is_logged_out() {
                        SessionEnd::LoggedOut
                    } else {
                        SessionEnd::Dropped
                    };
                }
            }
        };

        self.handle.replace(None).await;
        Ok(end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthState;
    use crate::error::WhatsAppError;
    use crate::greeter::SeenContacts;
    use crate::types::{DisconnectReason, Jid};
    use async_trait::async_trait;
    use pedido_core::GreetingTexts;
    use std::sync::Mutex;
    use tokio::sync::mpsc;
    use tokio::time::Instant;

    struct NullSender;

    #[async_trait]
    impl OutboundSender for NullSender {
        async fn send_text(&self, _to: &Jid, _text: &str) -> Result<()> {
            Ok(())
        }
    }

    enum Script {
        Fail,
        Session(Vec<TransportEvent>),
    }

    /// Scripted transport: each connect pops the next script entry.
    struct ScriptedTransport {
        scripts: Mutex<Vec<Script>>,
        connects: Arc<Mutex<Vec<Instant>>>,
    }

    impl ScriptedTransport {
        fn new(scripts: Vec<Script>) -> (Self, Arc<Mutex<Vec<Instant>>>) {
            let connects = Arc::new(Mutex::new(Vec::new()));
            let transport = Self {
                scripts: Mutex::new(scripts),
                connects: connects.clone(),
            };
            (transport, connects)
        }
    }

    #[async_trait]
    impl Connect for ScriptedTransport {
        async fn connect(&self, _auth: Option<AuthState>) -> Result<SessionChannel> {
            self.connects.lock().unwrap().push(Instant::now());

            let mut scripts = self.scripts.lock().unwrap();
            if scripts.is_empty() {
                return Err(WhatsAppError::Connect("script exhausted".to_string()));
            }

            match scripts.remove(0) {
                Script::Fail => Err(WhatsAppError::Connect("connection refused".to_string())),
                Script::Session(events) => {
                    let (tx, rx) = mpsc::channel(16);
                    for event in events {
                        tx.try_send(event).unwrap();
                    }
                    Ok(SessionChannel {
                        handle: Arc::new(NullSender),
                        events: rx,
                    })
                }
            }
        }
    }

    fn test_auth_store(name: &str) -> FileAuthStore {
        FileAuthStore::new(
            std::env::temp_dir()
                .join(format!("pedido-supervisor-{}-{}", name, std::process::id()))
                .join("creds.json"),
        )
    }

    fn supervisor_with(
        transport: ScriptedTransport,
        auth_store: FileAuthStore,
    ) -> (Supervisor<ScriptedTransport>, SharedHandle) {
        let handle = SharedHandle::new();
        let greeter = Greeter::new(
            handle.clone(),
            SeenContacts::new(),
            GreetingTexts::new("https://cardapio.example.com"),
            Duration::from_millis(0),
        );
        let supervisor = Supervisor::new(
            transport,
            handle.clone(),
            greeter,
            auth_store,
            Duration::from_secs(5),
        );
        (supervisor, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn test_logged_out_stops_reconnecting() {
        let (transport, connects) = ScriptedTransport::new(vec![Script::Session(vec![
            TransportEvent::Connected,
            TransportEvent::Disconnected(DisconnectReason::LoggedOut),
        ])]);
        let (supervisor, handle) = supervisor_with(transport, test_auth_store("loggedout"));

        supervisor.run().await;

        assert_eq!(connects.lock().unwrap().len(), 1);
        assert!(handle.current().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_after_fixed_delay() {
        let (transport, connects) = ScriptedTransport::new(vec![
            Script::Session(vec![TransportEvent::Disconnected(
                DisconnectReason::ConnectionLost { status_code: None },
            )]),
            Script::Session(vec![TransportEvent::Disconnected(DisconnectReason::LoggedOut)]),
        ]);
        let (supervisor, _handle) = supervisor_with(transport, test_auth_store("reconnect"));

        supervisor.run().await;

        let connects = connects.lock().unwrap();
        assert_eq!(connects.len(), 2);
        // the new session starts only after the full backoff
        assert!(connects[1] - connects[0] >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_failure_is_retried() {
        let (transport, connects) = ScriptedTransport::new(vec![
            Script::Fail,
            Script::Session(vec![TransportEvent::Disconnected(DisconnectReason::LoggedOut)]),
        ]);
        let (supervisor, _handle) = supervisor_with(transport, test_auth_store("retry"));

        supervisor.run().await;

        let connects = connects.lock().unwrap();
        assert_eq!(connects.len(), 2);
        assert!(connects[1] - connects[0] >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rotated_credentials_are_persisted() {
        let state = AuthState(serde_json::json!({"noise_key": "rotated"}));
        let (transport, _connects) = ScriptedTransport::new(vec![Script::Session(vec![
            TransportEvent::CredsRotated(state.clone()),
            TransportEvent::Disconnected(DisconnectReason::LoggedOut),
        ])]);
        let auth_store = test_auth_store("creds");
        let (supervisor, _handle) = supervisor_with(transport, auth_store.clone());

        supervisor.run().await;

        assert_eq!(auth_store.load().unwrap(), Some(state));
        std::fs::remove_dir_all(auth_store.path().parent().unwrap()).ok();
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_is_live_while_session_runs() {
        let (event_tx, event_rx) = mpsc::channel(4);

        struct OneShotTransport {
            session: Mutex<Option<SessionChannel>>,
        }

        #[async_trait]
        impl Connect for OneShotTransport {
            async fn connect(&self, _auth: Option<AuthState>) -> Result<SessionChannel> {
                self.session
                    .lock()
                    .unwrap()
                    .take()
                    .ok_or_else(|| WhatsAppError::Connect("already used".to_string()))
            }
        }

        let transport = OneShotTransport {
            session: Mutex::new(Some(SessionChannel {
                handle: Arc::new(NullSender),
                events: event_rx,
            })),
        };

        let handle = SharedHandle::new();
        let greeter = Greeter::new(
            handle.clone(),
            SeenContacts::new(),
            GreetingTexts::new("https://cardapio.example.com"),
            Duration::from_millis(0),
        );
        let supervisor = Supervisor::new(
            transport,
            handle.clone(),
            greeter,
            test_auth_store("live"),
            Duration::from_secs(5),
        );

        let task = tokio::spawn(supervisor.run());
        tokio::task::yield_now().await;

        event_tx.send(TransportEvent::Connected).await.unwrap();
        tokio::task::yield_now().await;
        assert!(handle.current().await.is_some());

        event_tx
            .send(TransportEvent::Disconnected(DisconnectReason::LoggedOut))
            .await
            .unwrap();
        task.await.unwrap();
        assert!(handle.current().await.is_none());
    }
}
