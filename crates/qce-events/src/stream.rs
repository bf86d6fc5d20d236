//! Persistent WebSocket connection with typed event dispatch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use qce_core::{QceError, QceResult};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::event::{Event, EventKind};
use crate::handlers::{HandlerId, HandlerRegistry};

pub const DEFAULT_URL: &str = "ws://localhost:40653";
const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_CONNECT_GRACE: Duration = Duration::from_millis(500);

/// Connection settings for [`EventStream`].
#[derive(Debug, Clone)]
pub struct EventStreamConfig {
    pub url: String,
    pub token: Option<String>,
    pub auto_reconnect: bool,
    pub reconnect_interval: Duration,
    /// How long [`EventStream::connect`] waits before returning.
    pub connect_grace: Duration,
}

impl Default for EventStreamConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            token: None,
            auto_reconnect: true,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            connect_grace: DEFAULT_CONNECT_GRACE,
        }
    }
}

impl EventStreamConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn for_service(host: &str, port: u16) -> Self {
        Self::new(format!("ws://{host}:{port}"))
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub const fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    #[must_use]
    pub const fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_connect_grace(mut self, grace: Duration) -> Self {
        self.connect_grace = grace;
        self
    }

    fn request(&self) -> tungstenite::Result<Request> {
        let mut request = self.url.as_str().into_client_request()?;
        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| tungstenite::Error::HttpFormat(e.into()))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }
        Ok(request)
    }
}

/// How one connection ended.
enum SessionEnd {
    Closed { code: Option<u16>, reason: String },
    Cancelled,
}

struct Inner {
    config: EventStreamConfig,
    handlers: HandlerRegistry,
    connected: AtomicBool,
    outgoing: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    cancel: Mutex<CancellationToken>,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Event stream from the service.
///
/// Cloning is cheap; clones share the connection and handlers.
#[derive(Clone)]
pub struct EventStream {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("url", &self.inner.config.url)
            .field("connected", &self.is_connected())
            .field("handlers", &self.inner.handlers)
            .finish()
    }
}

impl EventStream {
    pub fn new(config: EventStreamConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                handlers: HandlerRegistry::new(),
                connected: AtomicBool::new(false),
                outgoing: Mutex::new(None),
                cancel: Mutex::new(CancellationToken::new()),
                task: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &EventStreamConfig {
        &self.inner.config
    }

    /// Register a handler for an event type name.
    pub fn on<F>(&self, event_type: impl AsRef<str>, handler: F) -> HandlerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.inner.handlers.add(event_type.as_ref(), Arc::new(handler))
    }

    /// Remove one handler, or all handlers for the type when `id` is `None`.
    pub fn off(&self, event_type: impl AsRef<str>, id: Option<HandlerId>) {
        self.inner.handlers.remove(event_type.as_ref(), id);
    }

    pub fn on_export_progress<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.on(EventKind::ExportProgress, handler)
    }

    pub fn on_export_complete<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.on(EventKind::ExportComplete, handler)
    }

    pub fn on_export_error<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.on(EventKind::ExportError, handler)
    }

    /// Deliver an event to registered handlers as if it had been received.
    pub fn dispatch(&self, event: &Event) {
        self.inner.handlers.dispatch(event);
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Start the receive loop in the background.
    ///
    /// Returns after the configured grace delay; the connection may not be
    /// established yet, so check [`is_connected`](Self::is_connected).
    pub async fn connect(&self) {
        {
            let mut task = self.inner.task.lock().unwrap_or_else(PoisonError::into_inner);
            if task.as_ref().is_some_and(|t| !t.is_finished()) {
                debug!("event stream already running");
                return;
            }
            let cancel = self.reset_cancel();
            let inner = Arc::clone(&self.inner);
            *task = Some(tokio::spawn(async move { inner.run_loop(cancel).await }));
        }
        tokio::time::sleep(self.inner.config.connect_grace).await;
    }

    /// Run the receive loop on the current task until [`disconnect`](Self::disconnect)
    /// is called from a clone, or the connection ends with reconnection off.
    pub async fn run(&self) {
        let cancel = self.reset_cancel();
        Arc::clone(&self.inner).run_loop(cancel).await;
    }

    fn reset_cancel(&self) -> CancellationToken {
        let mut current = self.inner.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        if current.is_cancelled() {
            *current = CancellationToken::new();
        }
        current.clone()
    }

    /// Close the connection and stop reconnecting.
    pub async fn disconnect(&self) {
        self.inner
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
        let task = self
            .inner
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "event stream task ended abnormally");
            }
        }
        self.inner.connected.store(false, Ordering::Release);
    }

    /// Send a JSON control frame.
    pub fn send(&self, message: &Value) -> QceResult<()> {
        let outgoing = self
            .inner
            .outgoing
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let sender = outgoing
            .as_ref()
            .filter(|_| self.is_connected())
            .ok_or_else(|| QceError::WebSocket("event stream is not connected".to_string()))?;
        sender
            .send(Message::Text(message.to_string().into()))
            .map_err(|_| QceError::WebSocket("event stream connection closed".to_string()))
    }

    /// Ask the service to search a conversation, streaming results as
    /// `search_*` events. Returns the generated search id.
    pub fn start_stream_search(
        &self,
        chat_type: u8,
        peer_uid: &str,
        query: &str,
        start_time: Option<i64>,
        end_time: Option<i64>,
    ) -> QceResult<String> {
        let search_id = Uuid::new_v4().to_string();

        let mut filter = serde_json::Map::new();
        if let Some(start) = start_time {
            filter.insert("startTime".to_string(), json!(start));
        }
        if let Some(end) = end_time {
            filter.insert("endTime".to_string(), json!(end));
        }

        self.send(&json!({
            "type": "start_stream_search",
            "data": {
                "searchId": search_id,
                "peer": {"chatType": chat_type, "peerUid": peer_uid},
                "searchQuery": query,
                "filter": filter,
            }
        }))?;
        Ok(search_id)
    }

    pub fn cancel_search(&self, search_id: &str) -> QceResult<()> {
        self.send(&json!({
            "type": "cancel_search",
            "data": {"searchId": search_id}
        }))
    }
}

impl Inner {
    async fn run_loop(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            let end = self.session(&cancel).await;
            self.connected.store(false, Ordering::Release);
            *self.outgoing.lock().unwrap_or_else(PoisonError::into_inner) = None;

            let (code, reason) = match end {
                Ok(SessionEnd::Closed { code, reason }) => (code, Some(reason)),
                Ok(SessionEnd::Cancelled) => (None, None),
                Err(e) => {
                    warn!(url = %self.config.url, error = %e, "event stream error");
                    self.handlers
                        .dispatch(&Event::local(EventKind::Error, json!({"error": e.to_string()})));
                    (None, None)
                }
            };
            self.handlers.dispatch(&Event::local(
                EventKind::Disconnected,
                json!({"status_code": code, "message": reason}),
            ));

            if cancel.is_cancelled() || !self.config.auto_reconnect {
                break;
            }
            info!(
                interval = ?self.config.reconnect_interval,
                "event stream disconnected, reconnecting"
            );
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.config.reconnect_interval) => {}
            }
        }
        debug!("event stream loop exiting");
    }

    async fn session(&self, cancel: &CancellationToken) -> tungstenite::Result<SessionEnd> {
        let request = self.config.request()?;
        let (socket, _) = tokio::select! {
            () = cancel.cancelled() => return Ok(SessionEnd::Cancelled),
            result = connect_async(request) => result?,
        };
        let (mut write, mut read) = socket.split();

        let (tx, mut rx) = mpsc::unbounded_channel();
        *self.outgoing.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);
        self.connected.store(true, Ordering::Release);
        info!(url = %self.config.url, "event stream connected");

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!(error = %e, "failed to send close frame");
                    }
                    return Ok(SessionEnd::Cancelled);
                }
                Some(message) = rx.recv() => {
                    write.send(message).await?;
                }
                frame = read.next() => match frame {
                    None => {
                        return Ok(SessionEnd::Closed { code: None, reason: String::new() });
                    }
                    Some(Ok(Message::Text(text))) => self.handle_text(text.as_str()),
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame.map_or((None, String::new()), |f| {
                            (Some(u16::from(f.code)), f.reason.to_string())
                        });
                        return Ok(SessionEnd::Closed { code, reason });
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e),
                },
            }
        }
    }

    fn handle_text(&self, text: &str) {
        match serde_json::from_str::<Value>(text) {
            Ok(frame) => {
                let event = Event::from_frame(frame);
                debug!(event_type = %event.event_type, "event received");
                self.handlers.dispatch(&event);
            }
            Err(e) => warn!(error = %e, "failed to parse event frame"),
        }
    }
}
