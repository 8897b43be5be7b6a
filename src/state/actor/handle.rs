//! Cloneable handle used by connection tasks and the admin surface.

use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use super::types::*;
use crate::error::{RoomError, RoomResult};
use crate::proto::ClientEvent;
use crate::state::{ConnId, EventSender, RoomId, UserId};

#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<CoordinatorEvent>,
}

impl CoordinatorHandle {
    pub(super) fn new(tx: mpsc::Sender<CoordinatorEvent>) -> Self {
        Self { tx }
    }

    async fn post(&self, event: CoordinatorEvent) {
        if self.tx.send(event).await.is_err() {
            warn!("Coordinator is gone, event dropped");
        }
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> CoordinatorEvent) -> RoomResult<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| RoomError::Internal("coordinator unavailable".into()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Internal("coordinator dropped the request".into()))
    }

    pub async fn attach(&self, conn_id: ConnId, sender: EventSender) {
        self.post(CoordinatorEvent::Attach { conn_id, sender }).await;
    }

    pub async fn dispatch(&self, conn_id: ConnId, event: ClientEvent) {
        self.post(CoordinatorEvent::Client { conn_id, event }).await;
    }

    pub async fn detach(&self, conn_id: ConnId) {
        self.post(CoordinatorEvent::Detach { conn_id }).await;
    }

    pub async fn create_room(&self, owner: UserId, owner_name: Option<String>) -> RoomResult<CreatedRoom> {
        self.request(|reply_tx| CoordinatorEvent::CreateRoom {
            owner,
            owner_name,
            reply_tx,
        })
        .await?
    }

    pub async fn find_room(&self, friendly_name: String) -> RoomResult<Option<RoomId>> {
        self.request(|reply_tx| CoordinatorEvent::FindRoom {
            friendly_name,
            reply_tx,
        })
        .await
    }

    pub async fn health(&self) -> RoomResult<HealthSnapshot> {
        self.request(|reply_tx| CoordinatorEvent::Health { reply_tx }).await
    }

    pub async fn stats(&self) -> RoomResult<Vec<RoomStats>> {
        self.request(|reply_tx| CoordinatorEvent::Stats { reply_tx }).await
    }

    pub async fn list_rooms(&self) -> RoomResult<Vec<RoomSummary>> {
        self.request(|reply_tx| CoordinatorEvent::ListRooms { reply_tx }).await
    }

    pub async fn room_detail(&self, room_id: RoomId) -> RoomResult<RoomLookup> {
        self.request(|reply_tx| CoordinatorEvent::RoomDetail { room_id, reply_tx })
            .await
    }
}
