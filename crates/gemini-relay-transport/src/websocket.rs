//! WebSocket transport: one session per connection, one exchange at a time.

use std::collections::VecDeque;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{CloseFrame, Message, WebSocket, close_code},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use gemini_relay_core::{ExchangeId, ProviderError, Relay};
use tracing::Instrument;
use uuid::Uuid;

use crate::protocol::{ErrorPolicy, ServerFrame};

/// Messages a client may queue while an exchange is in flight.
///
/// One more ends the session with close code 1008.
pub const MAX_PENDING: usize = 32;

/// WebSocket handler state.
#[derive(Clone)]
pub struct RelayState {
    relay: Relay,
    policy: ErrorPolicy,
}

impl RelayState {
    /// Create new WebSocket state.
    #[must_use]
    pub const fn new(relay: Relay, policy: ErrorPolicy) -> Self {
        Self { relay, policy }
    }
}

/// Session error.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("WebSocket error: {0}")]
    Transport(#[from] axum::Error),
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("Failed to serialize frame: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Client queued more than {MAX_PENDING} messages during an exchange")]
    Backlog,
}

/// WebSocket upgrade handler.
///
/// Use this as an Axum route handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<RelayState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: RelayState) {
    let session_id = Uuid::new_v4();
    let span = tracing::info_span!("session", %session_id);

    async move {
        tracing::info!("WebSocket connected");
        let (sender, receiver) = socket.split();
        let session = Session {
            sender,
            receiver,
            pending: VecDeque::new(),
            policy: state.policy,
        };

        match session.run(&state.relay).await {
            Ok(exchanges) => tracing::info!(exchanges, "WebSocket disconnected"),
            Err(e) => tracing::warn!("Session ended: {e}"),
        }
    }
    .instrument(span)
    .await;
}

/// Outcome of reading from the client.
enum Inbound {
    Text(String),
    Ignore,
    Closed,
}

/// Whether the session keeps going after an exchange.
enum Flow {
    Continue,
    Closed,
}

struct Session {
    sender: SplitSink<WebSocket, Message>,
    receiver: SplitStream<WebSocket>,
    /// Messages that arrived while an exchange was in flight.
    pending: VecDeque<String>,
    policy: ErrorPolicy,
}

impl Session {
    /// Serve exchanges until the client goes away.
    ///
    /// Returns the number of exchanges started.
    async fn run(mut self, relay: &Relay) -> Result<usize, SessionError> {
        let mut exchanges = 0;
        loop {
            let message = match self.pending.pop_front() {
                Some(message) => message,
                None => match self.next_message().await? {
                    Some(message) => message,
                    None => return Ok(exchanges),
                },
            };

            exchanges += 1;
            match self.exchange(relay, &message).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Closed) => return Ok(exchanges),
                Err(SessionError::Provider(e)) => {
                    // Only reachable under ErrorPolicy::Disconnect.
                    self.close(close_code::ERROR, "provider error").await;
                    return Err(SessionError::Provider(e));
                }
                Err(SessionError::Backlog) => {
                    self.close(close_code::POLICY, "too many queued messages").await;
                    return Err(SessionError::Backlog);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Wait for the next text message; `None` once the client is gone.
    async fn next_message(&mut self) -> Result<Option<String>, SessionError> {
        loop {
            match classify(self.receiver.next().await)? {
                Inbound::Text(text) => return Ok(Some(text)),
                Inbound::Ignore => {}
                Inbound::Closed => return Ok(None),
            }
        }
    }

    /// Drive one exchange to completion, writing each envelope before pulling the next.
    ///
    /// The inbound side is polled concurrently so a disconnect drops the
    /// exchange, and with it the provider request.
    async fn exchange(&mut self, relay: &Relay, message: &str) -> Result<Flow, SessionError> {
        let exchange = relay.start(message);
        let id = exchange.id();
        let mut envelopes = exchange.into_stream();
        let mut sent = 0usize;

        tracing::debug!(exchange_id = %id, message_chars = message.len(), "Exchange started");

        loop {
            tokio::select! {
                next = envelopes.next() => match next {
                    Some(Ok(envelope)) => {
                        self.send(&ServerFrame::from(envelope)).await?;
                        sent += 1;
                    }
                    Some(Err(e)) => return self.provider_failed(id, e).await,
                    None => {
                        tracing::info!(exchange_id = %id, envelopes = sent, "Exchange finished");
                        return Ok(Flow::Continue);
                    }
                },
                inbound = self.receiver.next() => match classify(inbound)? {
                    Inbound::Text(_) if self.pending.len() >= MAX_PENDING => {
                        tracing::warn!(exchange_id = %id, queued = self.pending.len(), "Client is flooding, closing");
                        return Err(SessionError::Backlog);
                    }
                    Inbound::Text(text) => self.pending.push_back(text),
                    Inbound::Ignore => {}
                    Inbound::Closed => {
                        tracing::info!(exchange_id = %id, envelopes = sent, "Client left mid-exchange, cancelling");
                        return Ok(Flow::Closed);
                    }
                },
            }
        }
    }

    async fn provider_failed(&mut self, id: ExchangeId, error: ProviderError) -> Result<Flow, SessionError> {
        tracing::warn!(exchange_id = %id, policy = %self.policy, "Provider failed: {error}");
        match self.policy {
            ErrorPolicy::Report => {
                self.send(&ServerFrame::Error {
                    id,
                    error: error.to_string(),
                })
                .await?;
                Ok(Flow::Continue)
            }
            ErrorPolicy::Disconnect => Err(SessionError::Provider(error)),
        }
    }

    async fn close(&mut self, code: u16, reason: &'static str) {
        let frame = CloseFrame {
            code,
            reason: reason.into(),
        };
        if let Err(e) = self.sender.send(Message::Close(Some(frame))).await {
            tracing::debug!(code, "Failed to send close frame: {e}");
        }
    }

    async fn send(&mut self, frame: &ServerFrame) -> Result<(), SessionError> {
        let json = frame.to_json()?;
        self.sender.send(Message::Text(json.into())).await?;
        Ok(())
    }
}

fn classify(msg: Option<Result<Message, axum::Error>>) -> Result<Inbound, SessionError> {
    match msg {
        Some(Ok(Message::Text(text))) => Ok(Inbound::Text(text.as_str().to_owned())),
        Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
            Ok(text) => Ok(Inbound::Text(text)),
            Err(_) => {
                tracing::warn!(bytes = data.len(), "Ignoring non-UTF-8 binary frame");
                Ok(Inbound::Ignore)
            }
        },
        Some(Ok(Message::Close(_))) | None => Ok(Inbound::Closed),
        Some(Ok(_)) => Ok(Inbound::Ignore),
        Some(Err(e)) => Err(SessionError::Transport(e)),
    }
}

async fn health() -> &'static str {
    "ok"
}

/// Create the relay router: `/ws` for sessions, `/health` for liveness checks.
///
/// # Example
/// ```ignore
/// let app = create_router(RelayState::new(relay, ErrorPolicy::Report))
///     .layer(CorsLayer::permissive());
/// ```
#[must_use]
pub fn create_router(state: RelayState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .with_state(state)
}
