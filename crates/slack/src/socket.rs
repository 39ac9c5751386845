use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{net::TcpStream, sync::Mutex, task::JoinSet};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::events::{EventContext, EventDispatcher, HandlerResult, SlackEnvelope};
use crate::frames::{acknowledgement_frame, parse_socket_frame, SocketFrame};
use crate::web::{ChatPoster, NoopChatPoster, SlackWebClient};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

/// Exponential backoff between reconnect attempts. The attempt counter resets
/// after every successful connect, so `max_retries` bounds consecutive failures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

#[async_trait]
pub trait SocketTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    /// Next envelope, or `None` once the stream has ended cleanly.
    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError>;
    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

#[derive(Default)]
pub struct NoopSocketTransport;

#[async_trait]
impl SocketTransport for NoopSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
        Ok(None)
    }

    async fn acknowledge(&self, _envelope_id: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

type SlackSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Socket Mode over a real WebSocket. Each `connect` asks Slack for a fresh
/// session URL via `apps.connections.open`.
pub struct WebSocketTransport {
    web: SlackWebClient,
    socket: Mutex<Option<SlackSocket>>,
}

impl WebSocketTransport {
    pub fn new(web: SlackWebClient) -> Self {
        Self { web, socket: Mutex::new(None) }
    }
}

#[async_trait]
impl SocketTransport for WebSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let url = self
            .web
            .open_connection()
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;
        let (socket, _response) = connect_async(url.as_str())
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;

        *self.socket.lock().await = Some(socket);
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
        let mut guard = self.socket.lock().await;
        let socket =
            guard.as_mut().ok_or_else(|| TransportError::Receive("not connected".to_owned()))?;

        loop {
            let message = match socket.next().await {
                Some(Ok(message)) => message,
                Some(Err(error)) => return Err(TransportError::Receive(error.to_string())),
                None => return Err(TransportError::Receive("socket closed by peer".to_owned())),
            };

            let text = match message {
                Message::Text(text) => text,
                Message::Close(frame) => {
                    return Err(TransportError::Receive(format!("close frame received: {frame:?}")))
                }
                // ping/pong is answered by tungstenite itself
                _ => continue,
            };

            match parse_socket_frame(&text) {
                Ok(SocketFrame::Hello) => {
                    debug!(event_name = "ingress.slack.hello", "socket mode session ready");
                }
                Ok(SocketFrame::Disconnect { reason }) => {
                    return Err(TransportError::Receive(format!(
                        "slack requested disconnect: {reason}"
                    )));
                }
                Ok(SocketFrame::Envelope(envelope)) => return Ok(Some(envelope)),
                Err(error) => {
                    warn!(event_name = "ingress.slack.frame_rejected", error = %error, "skipping socket frame");
                }
            }
        }
    }

    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError> {
        let mut guard = self.socket.lock().await;
        let socket = guard
            .as_mut()
            .ok_or_else(|| TransportError::Acknowledge("not connected".to_owned()))?;

        socket
            .send(Message::Text(acknowledgement_frame(envelope_id)))
            .await
            .map_err(|error| TransportError::Acknowledge(error.to_string()))
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let Some(mut socket) = self.socket.lock().await.take() else {
            return Ok(());
        };
        socket.close(None).await.map_err(|error| TransportError::Disconnect(error.to_string()))
    }
}

pub struct SocketModeRunner {
    transport: Arc<dyn SocketTransport>,
    dispatcher: Arc<EventDispatcher>,
    poster: Arc<dyn ChatPoster>,
    reconnect_policy: ReconnectPolicy,
}

impl Default for SocketModeRunner {
    fn default() -> Self {
        Self {
            transport: Arc::new(NoopSocketTransport),
            dispatcher: Arc::new(EventDispatcher::default()),
            poster: Arc::new(NoopChatPoster),
            reconnect_policy: ReconnectPolicy::default(),
        }
    }
}

impl SocketModeRunner {
    pub fn new(
        transport: Arc<dyn SocketTransport>,
        dispatcher: EventDispatcher,
        poster: Arc<dyn ChatPoster>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher: Arc::new(dispatcher), poster, reconnect_policy }
    }

    /// Runs until the transport ends cleanly or reconnects are exhausted.
    /// Transport failures are logged, never returned.
    pub async fn start(&self) -> Result<()> {
        let mut attempt: u32 = 0;
        loop {
            let result = match self.connect(attempt).await {
                Ok(()) => {
                    attempt = 0;
                    self.pump().await
                }
                Err(error) => Err(error),
            };

            let Err(transport_error) = result else {
                return Ok(());
            };
            warn!(
                attempt,
                max_retries = self.reconnect_policy.max_retries,
                error = %transport_error,
                "socket mode transport failed"
            );

            if attempt >= self.reconnect_policy.max_retries {
                warn!(
                    max_retries = self.reconnect_policy.max_retries,
                    "socket mode retries exhausted; continuing process without crash"
                );
                return Ok(());
            }

            let delay = self.reconnect_policy.backoff(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }

    async fn connect(&self, attempt: u32) -> Result<(), TransportError> {
        info!(attempt, "opening socket mode transport connection");
        self.transport.connect().await?;
        info!(attempt, "socket mode transport connected");
        Ok(())
    }

    /// Acks each envelope, then handles it on its own task. In-flight tasks are
    /// drained before returning.
    async fn pump(&self) -> Result<(), TransportError> {
        let mut in_flight = JoinSet::new();
        let result = self.pump_envelopes(&mut in_flight).await;

        while in_flight.join_next().await.is_some() {}
        result
    }

    async fn pump_envelopes(&self, in_flight: &mut JoinSet<()>) -> Result<(), TransportError> {
        loop {
            while in_flight.try_join_next().is_some() {}

            let Some(envelope) = self.transport.next_envelope().await? else {
                info!("socket mode transport stream closed");
                self.transport.disconnect().await?;
                return Ok(());
            };

            info!(
                event_name = "ingress.slack.envelope_received",
                envelope_id = %envelope.envelope_id,
                event_type = ?envelope.event.event_type(),
                correlation_id = %envelope.envelope_id,
                "received slack envelope"
            );

            if let Err(error) = self.transport.acknowledge(&envelope.envelope_id).await {
                warn!(
                    event_name = "ingress.slack.ack_sent",
                    envelope_id = %envelope.envelope_id,
                    correlation_id = %envelope.envelope_id,
                    error = %error,
                    "failed to acknowledge slack envelope"
                );
            } else {
                debug!(
                    event_name = "ingress.slack.ack_sent",
                    envelope_id = %envelope.envelope_id,
                    correlation_id = %envelope.envelope_id,
                    "acknowledged slack envelope"
                );
            }

            in_flight.spawn(handle_envelope(
                Arc::clone(&self.dispatcher),
                Arc::clone(&self.poster),
                envelope,
            ));
        }
    }
}

async fn handle_envelope(
    dispatcher: Arc<EventDispatcher>,
    poster: Arc<dyn ChatPoster>,
    envelope: SlackEnvelope,
) {
    let context = EventContext { correlation_id: envelope.envelope_id.clone() };

    let reply = match dispatcher.dispatch(&envelope, &context).await {
        Ok(HandlerResult::Responded(reply)) => reply,
        Ok(HandlerResult::Processed | HandlerResult::Ignored) => return,
        Err(error) => {
            warn!(
                envelope_id = %envelope.envelope_id,
                correlation_id = %context.correlation_id,
                error = %error,
                "event dispatch failed; continuing socket loop"
            );
            return;
        }
    };

    match poster.post_message(&reply).await {
        Ok(()) => debug!(
            event_name = "egress.slack.reply_sent",
            correlation_id = %context.correlation_id,
            channel_id = %reply.channel_id,
            "posted reply"
        ),
        Err(error) => warn!(
            event_name = "egress.slack.reply_failed",
            correlation_id = %context.correlation_id,
            channel_id = %reply.channel_id,
            error = %error,
            "failed to send reply"
        ),
    }
}
