//! Test WebSocket client.
//!
//! Sends `{"event", "data"}` frames and asserts on the events received.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// A test WebSocket client.
pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    /// Connect to a test server.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let (ws, _) = connect_async(url).await?;
        Ok(Self { ws })
    }

    /// Send an event.
    pub async fn send(&mut self, event: &str, data: Value) -> anyhow::Result<()> {
        let frame = json!({ "event": event, "data": data }).to_string();
        self.send_raw(&frame).await
    }

    /// Send a raw text frame.
    pub async fn send_raw(&mut self, text: &str) -> anyhow::Result<()> {
        self.ws.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    /// Receive a single event.
    pub async fn recv(&mut self) -> anyhow::Result<Value> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    /// Receive an event with a timeout. Non-text frames are skipped.
    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<Value> {
        loop {
            let frame = timeout(dur, self.ws.next())
                .await?
                .ok_or_else(|| anyhow::anyhow!("connection closed"))??;
            match frame {
                Message::Text(text) => return Ok(serde_json::from_str(&text)?),
                Message::Close(_) => anyhow::bail!("connection closed"),
                _ => continue,
            }
        }
    }

    /// Receive events until one named `event` arrives; return its `data`.
    pub async fn recv_event(&mut self, event: &str) -> anyhow::Result<Value> {
        loop {
            let msg = self.recv().await?;
            if msg["event"] == event {
                return Ok(msg["data"].clone());
            }
        }
    }

    /// Receive events until the predicate matches, returning all of them.
    #[allow(dead_code)]
    pub async fn recv_until<F>(&mut self, mut predicate: F) -> anyhow::Result<Vec<Value>>
    where
        F: FnMut(&Value) -> bool,
    {
        let mut messages = Vec::new();
        loop {
            let msg = self.recv().await?;
            let done = predicate(&msg);
            messages.push(msg);
            if done {
                break;
            }
        }
        Ok(messages)
    }

    /// Discard whatever is already queued.
    #[allow(dead_code)]
    pub async fn drain(&mut self) {
        while self.recv_timeout(Duration::from_millis(100)).await.is_ok() {}
    }

    /// Bind an identity and join (or create, when `owner`) a room.
    pub async fn join(&mut self, room_id: &str, user_id: &str, owner: bool) -> anyhow::Result<Value> {
        self.send(
            "join-room",
            json!({ "roomId": room_id, "userId": user_id, "userName": user_id, "isRoomOwner": owner }),
        )
        .await?;
        self.recv_event("room-joined").await
    }

    /// Close the socket.
    pub async fn close(mut self) -> anyhow::Result<()> {
        self.ws.close(None).await?;
        Ok(())
    }
}
