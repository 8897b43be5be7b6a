//! Connection - one WebSocket client.
//!
//! Each connection runs in its own Tokio task:
//!
//! ```text
//!   ws frames ──▶ flood guard ──▶ ClientEvent::decode ──▶ CoordinatorHandle
//!                                        │ (error)
//!                                        ▼
//!   ws sink ◀──────────────── room-error / outbound queue ◀── Coordinator
//! ```
//!
//! The coordinator pushes into a bounded outbound queue; this task is the only
//! writer of the socket.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, info, warn};

use super::limit::{FloodGuard, Verdict};
use crate::config::LimitsConfig;
use crate::error::{ProtocolError, RoomError};
use crate::metrics;
use crate::proto::{ClientEvent, ServerEvent};
use crate::state::{ConnId, CoordinatorHandle};

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// A client connection handler.
pub struct Connection {
    conn_id: ConnId,
    addr: SocketAddr,
    stream: WebSocketStream<TcpStream>,
    coordinator: CoordinatorHandle,
    limits: Arc<LimitsConfig>,
}

impl Connection {
    pub fn new(
        conn_id: ConnId,
        stream: WebSocketStream<TcpStream>,
        addr: SocketAddr,
        coordinator: CoordinatorHandle,
        limits: Arc<LimitsConfig>,
    ) -> Self {
        Self {
            conn_id,
            addr,
            stream,
            coordinator,
            limits,
        }
    }

    /// Run until the peer goes away, then report the detach.
    pub async fn run(self) -> anyhow::Result<()> {
        let Self {
            conn_id,
            addr,
            stream,
            coordinator,
            limits,
        } = self;
        info!(%addr, "Client connected");
        metrics::inc_connected_sockets();

        let (mut sink, mut frames) = stream.split();
        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Arc<ServerEvent>>(limits.outbound_queue);
        coordinator.attach(conn_id.clone(), outgoing_tx).await;

        let mut guard = FloodGuard::new(limits.messages_per_second, limits.message_burst);

        loop {
            tokio::select! {
                frame = frames.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            match guard.check() {
                                Verdict::Allow => {}
                                Verdict::Throttle => {
                                    debug!("Rate limited, frame dropped");
                                    let error = RoomError::ValidationFailed("rate limit exceeded".into());
                                    if !reply_error(&mut sink, error).await {
                                        break;
                                    }
                                    continue;
                                }
                                Verdict::Disconnect => {
                                    warn!("Excess flood, closing connection");
                                    let _ = sink
                                        .send(Message::Close(Some(CloseFrame {
                                            code: CloseCode::Policy,
                                            reason: "excess flood".into(),
                                        })))
                                        .await;
                                    break;
                                }
                            }

                            match ClientEvent::decode(&text, limits.max_frame_bytes) {
                                Ok(event) => coordinator.dispatch(conn_id.clone(), event).await,
                                Err(e) => {
                                    debug!(error = %e, "Rejected frame");
                                    if !reply_error(&mut sink, e.into()).await {
                                        break;
                                    }
                                }
                            }
                        }
                        Some(Ok(Message::Binary(_))) => {
                            if !reply_error(&mut sink, ProtocolError::Binary.into()).await {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            info!("Client disconnected");
                            break;
                        }
                        // ping/pong are answered by tungstenite
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!(error = %e, "Read error");
                            break;
                        }
                    }
                }

                Some(event) = outgoing_rx.recv() => {
                    let frame = match event.to_frame() {
                        Ok(frame) => frame,
                        Err(e) => {
                            warn!(error = %e, "Failed to encode outbound event");
                            continue;
                        }
                    };
                    if let Err(e) = sink.send(Message::Text(frame)).await {
                        warn!(error = %e, "Write error");
                        break;
                    }
                }
            }
        }

        coordinator.detach(conn_id).await;
        metrics::dec_connected_sockets();
        Ok(())
    }
}

/// Answer a bad frame with `room-error`. Returns false when the socket is
/// no longer writable.
async fn reply_error(sink: &mut WsSink, error: RoomError) -> bool {
    let event = error.to_event(None);
    let Ok(frame) = event.to_frame() else {
        return true;
    };
    sink.send(Message::Text(frame)).await.is_ok()
}
