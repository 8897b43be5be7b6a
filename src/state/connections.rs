//! Connection table: live transport connections and the identity bound to each.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::{ConnId, RoomId, UserId};
use crate::metrics;
use crate::proto::ServerEvent;

/// Outbound half of a connection's queue.
pub type EventSender = mpsc::Sender<Arc<ServerEvent>>;

#[derive(Debug)]
pub struct ConnectionEntry {
    pub sender: EventSender,
    pub user_id: Option<UserId>,
    pub room_id: Option<RoomId>,
}

#[derive(Debug, Default)]
pub struct ConnectionTable {
    conns: HashMap<ConnId, ConnectionEntry>,
    by_user: HashMap<UserId, ConnId>,
}

impl ConnectionTable {
    pub fn attach(&mut self, conn_id: ConnId, sender: EventSender) {
        self.conns.insert(
            conn_id,
            ConnectionEntry {
                sender,
                user_id: None,
                room_id: None,
            },
        );
    }

    /// Remove a connection. The user index is only cleared if it still
    /// points at this connection.
    pub fn detach(&mut self, conn_id: &str) -> Option<ConnectionEntry> {
        let entry = self.conns.remove(conn_id)?;
        if let Some(ref user_id) = entry.user_id
            && self.by_user.get(user_id).map(String::as_str) == Some(conn_id)
        {
            self.by_user.remove(user_id);
        }
        Some(entry)
    }

    pub fn get(&self, conn_id: &str) -> Option<&ConnectionEntry> {
        self.conns.get(conn_id)
    }

    /// Bind a user identity to a connection; it becomes the user's latest
    /// connection. Rebinding to a different user releases the old one.
    pub fn bind_user(&mut self, conn_id: &str, user_id: &UserId) {
        let Some(entry) = self.conns.get_mut(conn_id) else {
            return;
        };
        if let Some(previous) = entry.user_id.replace(user_id.clone())
            && &previous != user_id
        {
            if self.by_user.get(&previous).map(String::as_str) == Some(conn_id) {
                self.by_user.remove(&previous);
            }
            entry.room_id = None;
        }
        self.by_user.insert(user_id.clone(), conn_id.to_string());
    }

    pub fn bind_room(&mut self, conn_id: &str, room_id: Option<RoomId>) {
        if let Some(entry) = self.conns.get_mut(conn_id) {
            entry.room_id = room_id;
        }
    }

    /// Clear the room binding of a connection if it still points at `room_id`.
    pub fn unbind_room(&mut self, conn_id: &str, room_id: &str) {
        if let Some(entry) = self.conns.get_mut(conn_id)
            && entry.room_id.as_deref() == Some(room_id)
        {
            entry.room_id = None;
        }
    }

    pub fn user_of(&self, conn_id: &str) -> Option<&UserId> {
        self.conns.get(conn_id)?.user_id.as_ref()
    }

    pub fn room_of(&self, conn_id: &str) -> Option<&RoomId> {
        self.conns.get(conn_id)?.room_id.as_ref()
    }

    pub fn conn_of_user(&self, user_id: &str) -> Option<&ConnId> {
        self.by_user.get(user_id)
    }

    pub fn len(&self) -> usize {
        self.conns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conns.is_empty()
    }

    /// Non-blocking delivery. A full or closed queue drops the event.
    pub fn send(&self, conn_id: &str, event: Arc<ServerEvent>) -> bool {
        let Some(entry) = self.conns.get(conn_id) else {
            return false;
        };
        match entry.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                metrics::record_dropped_delivery("queue_full");
                tracing::debug!(conn_id = %conn_id, "Outbound queue full, event dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                metrics::record_dropped_delivery("closed");
                false
            }
        }
    }
}
