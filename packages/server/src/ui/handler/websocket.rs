//! WebSocket connection handler.

use std::sync::Arc;

use axum::{
    extract::{Query, State, ws::WebSocketUpgrade},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    domain::RoomId,
    infrastructure::transport::websocket,
    ui::{session::serve_connection, state::AppState},
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    /// Room to join; omitted or empty means the global room
    #[serde(default)]
    pub room: Option<String>,
    /// Display name used when a message carries no sender
    #[serde(default)]
    pub client_id: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    if state.hub.is_closed() {
        tracing::warn!("Hub is closed, refusing WebSocket upgrade");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    let room = RoomId::from(query.room.unwrap_or_default());
    let name = query.client_id;

    Ok(ws.on_upgrade(move |socket| async move {
        let (inbound, outbound) = websocket::split(socket);
        serve_connection(state, room, name, inbound, outbound).await;
    }))
}
