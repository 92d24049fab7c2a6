//! Requests submitted to the hub.

use std::collections::BTreeMap;

use serde::Serialize;
use tokio::sync::oneshot;

use crate::domain::{ConnectionId, Message};

use super::handle::ClientHandle;

/// One request for the dispatcher. All kinds share a single FIFO channel.
#[derive(Debug)]
pub(crate) enum HubCommand {
    Register(ClientHandle),
    Unregister(ConnectionId),
    Broadcast {
        origin: Option<ConnectionId>,
        message: Message,
    },
    Stats(oneshot::Sender<HubStats>),
    Shutdown,
}

/// Snapshot of the hub answered from inside the dispatcher loop
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    /// Registered clients
    pub clients: usize,
    /// Registered clients per room ("" is the global room)
    pub rooms: BTreeMap<String, usize>,
    /// Deliveries dropped because a recipient's queue was full
    pub dropped_messages: u64,
}
