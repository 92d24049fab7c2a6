//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::{domain::RoomId, hub::HubStats, ui::state::AppState, wire::MessageDto};

const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Query parameters for the message history endpoint
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Current occupancy of every room
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Result<Json<HubStats>, StatusCode> {
    match state.hub.stats().await {
        Ok(stats) => Ok(Json(stats)),
        Err(e) => {
            tracing::warn!("Failed to query hub stats: {}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// Recent messages of one room, oldest first
pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<MessageDto>>, StatusCode> {
    let Some(repository) = &state.repository else {
        return Err(StatusCode::NOT_FOUND);
    };

    let room = RoomId::from(query.room.unwrap_or_default());
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);

    match repository.recent(&room, limit).await {
        Ok(messages) => Ok(Json(messages.iter().map(MessageDto::from).collect())),
        Err(e) => {
            tracing::error!("Failed to load history of room {}: {}", room, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
