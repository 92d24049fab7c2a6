//! The hub's serialized loop.
//!
//! The dispatcher is the single owner of the [`Registry`]. It applies one
//! request at a time, in the order requests arrived on its channel, which is
//! the linearization point for register, unregister and broadcast.

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::{
    config::{HubConfig, OverflowPolicy},
    domain::{ConnectionId, Message},
};

use super::{
    command::{HubCommand, HubStats},
    handle::ClientHandle,
    registry::Registry,
};

pub(crate) struct Dispatcher {
    commands: mpsc::UnboundedReceiver<HubCommand>,
    registry: Registry,
    config: HubConfig,
    dropped_messages: u64,
}

impl Dispatcher {
    pub(crate) fn new(commands: mpsc::UnboundedReceiver<HubCommand>, config: HubConfig) -> Self {
        Self {
            commands,
            registry: Registry::new(),
            config,
            dropped_messages: 0,
        }
    }

    /// Run until shutdown is requested or every `Hub` clone is dropped.
    pub(crate) async fn run(mut self) {
        tracing::info!(
            "Hub started (queue capacity {}, overflow {:?}, room scoped {})",
            self.config.effective_capacity(),
            self.config.overflow,
            self.config.room_scoped
        );

        while let Some(command) = self.commands.recv().await {
            match command {
                HubCommand::Register(handle) => self.register(handle),
                HubCommand::Unregister(id) => self.unregister(id),
                HubCommand::Broadcast { origin, message } => self.broadcast(origin, message).await,
                HubCommand::Stats(reply) => {
                    // The caller may have given up waiting
                    let _ = reply.send(self.stats());
                }
                HubCommand::Shutdown => {
                    tracing::info!("Hub shutdown requested");
                    self.commands.close();
                    break;
                }
            }
        }

        self.close_all();
        tracing::info!("Hub stopped");
    }

    fn register(&mut self, handle: ClientHandle) {
        let id = handle.id();
        tracing::info!(
            "Client '{}' ({}) registered in room {}",
            handle.name(),
            id,
            handle.room()
        );
        if let Some(previous) = self.registry.insert(handle) {
            // Identities are never reused; a duplicate means the caller
            // registered the same connection twice.
            tracing::warn!("Replaced existing registration for {}", previous.id());
        }
        tracing::debug!("{} clients registered", self.registry.len());
    }

    fn unregister(&mut self, id: ConnectionId) {
        match self.registry.remove(id) {
            Some(handle) => {
                tracing::info!(
                    "Client '{}' ({}) unregistered from room {}",
                    handle.name(),
                    id,
                    handle.room()
                );
                // Dropping the handle drops the only queue sender.
                drop(handle);
            }
            None => tracing::debug!("Unregister for unknown client {}, ignoring", id),
        }
    }

    async fn broadcast(&mut self, origin: Option<ConnectionId>, message: Message) {
        let mut closed = Vec::new();
        let mut delivered = 0usize;

        for handle in self
            .registry
            .recipients(origin, message.room(), &self.config)
        {
            let outcome = match self.config.overflow {
                OverflowPolicy::Drop => handle.try_enqueue(message.clone()),
                OverflowPolicy::Block => handle
                    .enqueue(message.clone())
                    .await
                    .map_err(|err| TrySendError::Closed(err.0)),
            };

            match outcome {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    self.dropped_messages += 1;
                    tracing::warn!(
                        "Outbound queue of '{}' ({}) is full, dropping message from '{}'",
                        handle.name(),
                        handle.id(),
                        message.sender()
                    );
                }
                Err(TrySendError::Closed(_)) => closed.push(handle.id()),
            }
        }

        tracing::debug!(
            "Broadcast from '{}' in room {} delivered to {} clients",
            message.sender(),
            message.room(),
            delivered
        );

        for id in closed {
            tracing::warn!("Outbound pump of {} is gone, pruning client", id);
            self.unregister(id);
        }
    }

    fn stats(&self) -> HubStats {
        HubStats {
            clients: self.registry.len(),
            rooms: self.registry.room_occupancy(),
            dropped_messages: self.dropped_messages,
        }
    }

    fn close_all(&mut self) {
        let handles = self.registry.drain();
        if !handles.is_empty() {
            tracing::info!("Closing {} outbound queues", handles.len());
        }
        drop(handles);
    }
}
