//! Registry of connected clients.
//!
//! Only the dispatcher task touches a `Registry`, so nothing here locks.

use std::collections::{BTreeMap, HashMap};

use crate::{
    config::HubConfig,
    domain::{ConnectionId, RoomId},
};

use super::handle::ClientHandle;

#[derive(Debug, Default)]
pub(crate) struct Registry {
    clients: HashMap<ConnectionId, ClientHandle>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handle. Returns the previous handle for the same id, if any.
    pub fn insert(&mut self, handle: ClientHandle) -> Option<ClientHandle> {
        self.clients.insert(handle.id(), handle)
    }

    pub fn remove(&mut self, id: ConnectionId) -> Option<ClientHandle> {
        self.clients.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Remove every handle, returning them to the caller
    pub fn drain(&mut self) -> Vec<ClientHandle> {
        self.clients.drain().map(|(_, handle)| handle).collect()
    }

    /// Handles that should receive a message for `room` sent by `origin`.
    pub fn recipients<'a>(
        &'a self,
        origin: Option<ConnectionId>,
        room: &'a RoomId,
        config: &'a HubConfig,
    ) -> impl Iterator<Item = &'a ClientHandle> + 'a {
        self.clients
            .values()
            .filter(move |handle| is_recipient(handle, origin, room, config))
    }

    /// Number of clients per room, keyed by room id (global room is "")
    pub fn room_occupancy(&self) -> BTreeMap<String, usize> {
        let mut rooms = BTreeMap::new();
        for handle in self.clients.values() {
            *rooms.entry(handle.room().as_str().to_string()).or_insert(0) += 1;
        }
        rooms
    }
}

/// Decide whether `handle` receives a message for `room` sent by `origin`.
///
/// # Arguments
///
/// * `handle` - Candidate recipient
/// * `origin` - Connection that submitted the message (`None` for server notices)
/// * `room` - Room of the message
/// * `config` - Room scoping and echo settings
pub(crate) fn is_recipient(
    handle: &ClientHandle,
    origin: Option<ConnectionId>,
    room: &RoomId,
    config: &HubConfig,
) -> bool {
    if !config.echo_to_sender && origin == Some(handle.id()) {
        return false;
    }
    !config.room_scoped || handle.room() == room
}
