//! Gateway - WebSocket listener that accepts incoming connections.
//!
//! The Gateway binds the real-time socket and spawns a Connection task for
//! each client that completes the handshake.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tracing::{Instrument, error, info, instrument, warn};

use crate::config::{LimitsConfig, ListenConfig};
use crate::network::Connection;
use crate::state::{ConnIdGenerator, CoordinatorHandle};
use crate::telemetry::spans;

/// The Gateway accepts incoming WebSocket connections and spawns handlers.
pub struct Gateway {
    listener: TcpListener,
    allow_origins: Arc<Vec<String>>,
    coordinator: CoordinatorHandle,
    limits: Arc<LimitsConfig>,
    conn_ids: ConnIdGenerator,
}

impl Gateway {
    pub async fn bind(listen: &ListenConfig, limits: LimitsConfig, coordinator: CoordinatorHandle) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(listen.address).await?;
        info!(address = %listen.address, "WebSocket listener bound");

        Ok(Self {
            listener,
            allow_origins: Arc::new(listen.allow_origins.clone()),
            coordinator,
            limits: Arc::new(limits),
            conn_ids: ConnIdGenerator::new("ws"),
        })
    }

    /// Run the gateway, accepting connections forever.
    #[instrument(skip(self), name = "gateway")]
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!(error = %e, "Failed to accept WebSocket connection");
                    continue;
                }
            };

            let conn_id = self.conn_ids.next();
            let allowed = Arc::clone(&self.allow_origins);
            let coordinator = self.coordinator.clone();
            let limits = Arc::clone(&self.limits);
            let span = spans::connection(&conn_id, &addr);

            tokio::spawn(
                async move {
                    let check_origin = |req: &Request, response: Response| {
                        let origin = req.headers().get("Origin").and_then(|o| o.to_str().ok());
                        if origin_allowed(&allowed, origin) {
                            return Ok(response);
                        }
                        warn!(origin = ?origin, "WebSocket origin rejected");
                        Err(forbidden())
                    };

                    match accept_hdr_async(stream, check_origin).await {
                        Ok(ws_stream) => {
                            let connection = Connection::new(conn_id, ws_stream, addr, coordinator, limits);
                            if let Err(e) = connection.run().await {
                                error!(error = %e, "Connection error");
                            }
                            info!("Connection closed");
                        }
                        Err(e) => {
                            warn!(error = %e, "WebSocket handshake failed");
                        }
                    }
                }
                .instrument(span),
            );
        }
    }
}

/// An empty allow-list admits every origin, as does a `*` entry. Requests
/// without an Origin header (non-browser clients) are admitted.
fn origin_allowed(allowed: &[String], origin: Option<&str>) -> bool {
    if allowed.is_empty() {
        return true;
    }
    match origin {
        Some(origin) => allowed.iter().any(|a| a == origin || a == "*"),
        None => true,
    }
}

fn forbidden() -> ErrorResponse {
    let mut response = ErrorResponse::new(Some("origin not allowed".to_string()));
    *response.status_mut() = http::StatusCode::FORBIDDEN;
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(origins: &[&str]) -> Vec<String> {
        origins.iter().map(|o| o.to_string()).collect()
    }

    #[test]
    fn empty_allow_list_admits_everyone() {
        assert!(origin_allowed(&[], Some("https://evil.example")));
    }

    #[test]
    fn origin_must_match_an_entry() {
        let allowed = list(&["https://app.example"]);
        assert!(origin_allowed(&allowed, Some("https://app.example")));
        assert!(!origin_allowed(&allowed, Some("https://evil.example")));
        assert!(origin_allowed(&list(&["*"]), Some("https://evil.example")));
    }

    #[test]
    fn missing_origin_is_admitted() {
        assert!(origin_allowed(&list(&["https://app.example"]), None));
    }
}
