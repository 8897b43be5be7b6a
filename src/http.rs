//! Administrative HTTP surface.
//!
//! Runs on a separate tokio task and its own listener. Every handler asks the
//! coordinator for a snapshot through its handle; nothing here touches room
//! state directly. `/metrics` serves the Prometheus registry.

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::RoomError;
use crate::state::actor::{CreatedRoom, RoomLookup, RoomStats, RoomSummary};
use crate::state::{CoordinatorHandle, UserId};

#[derive(Clone)]
pub struct AdminState {
    coordinator: CoordinatorHandle,
    server_name: String,
    started: Instant,
}

impl AdminState {
    pub fn new(coordinator: CoordinatorHandle, server_name: impl Into<String>) -> Self {
        Self {
            coordinator,
            server_name: server_name.into(),
            started: Instant::now(),
        }
    }
}

impl IntoResponse for RoomError {
    fn into_response(self) -> Response {
        let status = match &self {
            RoomError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            RoomError::RoomNotFound(_) => StatusCode::NOT_FOUND,
            RoomError::DuplicateRoom(_) => StatusCode::CONFLICT,
            RoomError::Internal(detail) => {
                tracing::error!(detail = %detail, "Admin request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        };
        let message = match &self {
            RoomError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        };
        (status, Json(json!({ "type": self.kind(), "message": message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRoomBody {
    #[serde(default)]
    owner: UserId,
    #[serde(default)]
    owner_name: Option<String>,
}

/// POST /create-room
async fn create_room(
    State(state): State<AdminState>,
    Json(body): Json<CreateRoomBody>,
) -> Result<Json<CreatedRoom>, RoomError> {
    let created = state.coordinator.create_room(body.owner, body.owner_name).await?;
    Ok(Json(created))
}

/// GET /find-room/:friendly_name
async fn find_room(State(state): State<AdminState>, Path(friendly_name): Path<String>) -> Result<Json<Value>, RoomError> {
    let body = match state.coordinator.find_room(friendly_name).await? {
        Some(room_id) => json!({ "roomId": room_id, "exists": true }),
        None => json!({ "exists": false }),
    };
    Ok(Json(body))
}

/// GET /health
async fn health(State(state): State<AdminState>) -> Result<Json<Value>, RoomError> {
    let snapshot = state.coordinator.health().await?;
    Ok(Json(json!({
        "status": "ok",
        "server": state.server_name,
        "timestamp": Utc::now(),
        "rooms": snapshot.rooms,
        "users": snapshot.users,
        "connections": snapshot.connections,
        "uptime": state.started.elapsed().as_secs_f64(),
    })))
}

/// GET /stats
async fn stats(State(state): State<AdminState>) -> Result<Json<Vec<RoomStats>>, RoomError> {
    Ok(Json(state.coordinator.stats().await?))
}

/// GET /api/rooms
async fn list_rooms(State(state): State<AdminState>) -> Result<Json<Vec<RoomSummary>>, RoomError> {
    Ok(Json(state.coordinator.list_rooms().await?))
}

/// GET /api/rooms/:room_id
async fn room_detail(State(state): State<AdminState>, Path(room_id): Path<String>) -> Result<Response, RoomError> {
    let lookup = state.coordinator.room_detail(room_id).await?;
    let status = match lookup {
        RoomLookup::Found(_) => StatusCode::OK,
        RoomLookup::Missing { .. } => StatusCode::NOT_FOUND,
    };
    Ok((status, Json(lookup)).into_response())
}

/// GET /metrics
async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

pub fn router(state: AdminState) -> Router {
    Router::new()
        .route("/create-room", post(create_room))
        .route("/find-room/:friendly_name", get(find_room))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/api/rooms", get(list_rooms))
        .route("/api/rooms/:room_id", get(room_detail))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Run the admin HTTP server. Long-running; spawn it in the background.
pub async fn run_http_server(addr: SocketAddr, state: AdminState) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind admin HTTP server");
            return;
        }
    };
    tracing::info!(%addr, "Admin HTTP server listening");

    if let Err(e) = axum::serve(listener, router(state)).await {
        tracing::error!(error = %e, "Admin HTTP server error");
    }
}
