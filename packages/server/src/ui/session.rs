//! Lifecycle of one accepted connection, independent of the transport.

use std::sync::Arc;

use crate::{
    domain::{
        ConnectionId, InboundTransport, Message, MessageContent, OutboundTransport, RoomId,
    },
    pump::{InboundPump, OutboundPump},
};

use super::state::AppState;

/// Run one connection until both of its pumps have stopped.
///
/// Order of events:
/// 1. create the client handle and start its outbound pump
/// 2. register the handle (and announce the join, if enabled)
/// 3. run the inbound pump
/// 4. tear down: whichever pump stops first, the connection ends up
///    unregistered and the outbound pump drains what was queued
pub async fn serve_connection<I, O>(
    state: Arc<AppState>,
    room: RoomId,
    name: Option<String>,
    inbound: I,
    outbound: O,
) where
    I: InboundTransport + 'static,
    O: OutboundTransport + 'static,
{
    let (handle, queue) = state.hub.new_client(room.clone(), name);
    let id = handle.id();
    let name = handle.name().to_string();

    let mut outbound_task = OutboundPump::new(queue, outbound, state.hub.clone()).spawn();
    let inbound_pump = InboundPump::new(&handle, inbound, state.hub.clone(), state.clock.clone())
        .with_repository(state.repository.clone());

    if state.hub.register(handle).is_err() {
        // The handle was dropped with the request, so the outbound pump
        // sees a closed queue and exits on its own.
        tracing::warn!("Hub is closed, rejecting client '{}' ({})", name, id);
        if let Err(e) = outbound_task.await {
            tracing::debug!("Outbound pump of rejected client {} failed: {}", id, e);
        }
        return;
    }
    tracing::info!("Client '{}' ({}) connected to room {}", name, id, room);

    if state.announce_presence {
        announce(&state, Some(id), &room, format!("{name} joined"));
    }

    let mut inbound_task = inbound_pump.spawn();

    let outbound_finished_first = tokio::select! {
        _ = &mut inbound_task => false,
        _ = &mut outbound_task => true,
    };

    if outbound_finished_first {
        // The queue was closed by the hub (write failure or shutdown); the
        // reader has nothing left to feed.
        inbound_task.abort();
        if state.hub.unregister(id).is_err() {
            tracing::debug!("Hub already closed, {} needs no unregistration", id);
        }
    } else if let Err(e) = outbound_task.await {
        tracing::warn!("Outbound pump of {} failed: {}", id, e);
    }

    tracing::info!("Client '{}' ({}) disconnected", name, id);

    if state.announce_presence {
        announce(&state, None, &room, format!("{name} left"));
    }
}

fn announce(state: &AppState, origin: Option<ConnectionId>, room: &RoomId, text: String) {
    let Ok(content) = MessageContent::new(text) else {
        return;
    };
    let notice = Message::notice(room.clone(), content, state.clock.now());
    if state.hub.broadcast(origin, notice).is_err() {
        tracing::debug!("Hub closed, presence notice for room {} not sent", room);
    }
}
