//! Network listener configuration.

use serde::Deserialize;
use std::net::SocketAddr;

/// WebSocket listener configuration (real-time event surface).
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Address to bind to (e.g., "0.0.0.0:3001").
    pub address: SocketAddr,
    /// Allowed origins checked during the WebSocket handshake
    /// (e.g., `["https://meet.example.com"]`). Empty list allows all origins.
    #[serde(default)]
    pub allow_origins: Vec<String>,
}

/// Administrative HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Address to bind to (e.g., "0.0.0.0:3000").
    pub address: SocketAddr,
}
