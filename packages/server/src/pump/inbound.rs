//! Inbound pump: transport -> hub.

use std::sync::Arc;

use agora_shared::time::Clock;
use tokio::task::JoinHandle;

use crate::{
    domain::{
        ConnectionId, DecodeError, InboundTransport, Message, MessageId, MessageRepository,
        RoomId, TransportError,
    },
    hub::{ClientHandle, Hub},
    wire,
};

/// Why an inbound pump stopped
#[derive(Debug)]
pub enum InboundExit {
    /// The peer ended the stream
    EndOfStream,
    /// Reading from the transport failed
    ReadFailed(TransportError),
    /// The hub shut down while the pump was running
    HubClosed,
}

/// Reads frames from one connection and submits them to the hub.
pub struct InboundPump<T> {
    id: ConnectionId,
    room: RoomId,
    name: String,
    transport: T,
    hub: Hub,
    clock: Arc<dyn Clock>,
    repository: Option<Arc<dyn MessageRepository>>,
}

impl<T: InboundTransport> InboundPump<T> {
    /// Create a pump for the connection described by `handle`.
    ///
    /// Call this before the handle is moved into [`Hub::register`].
    pub fn new(handle: &ClientHandle, transport: T, hub: Hub, clock: Arc<dyn Clock>) -> Self {
        Self {
            id: handle.id(),
            room: handle.room().clone(),
            name: handle.name().to_string(),
            transport,
            hub,
            clock,
            repository: None,
        }
    }

    /// Save every accepted message to `repository` before broadcasting it
    pub fn with_repository(mut self, repository: Option<Arc<dyn MessageRepository>>) -> Self {
        self.repository = repository;
        self
    }

    /// Pump until the stream ends, then unregister the connection once.
    pub async fn run(mut self) -> InboundExit {
        let exit = self.pump().await;

        match &exit {
            InboundExit::EndOfStream => {
                tracing::info!("Client '{}' ({}) closed the connection", self.name, self.id)
            }
            InboundExit::ReadFailed(e) => {
                tracing::warn!("Read from '{}' ({}) failed: {}", self.name, self.id, e)
            }
            InboundExit::HubClosed => {
                tracing::debug!("Hub closed while reading from {}", self.id)
            }
        }

        if self.hub.unregister(self.id).is_err() {
            tracing::debug!("Hub already closed, {} needs no unregistration", self.id);
        }
        exit
    }

    pub fn spawn(self) -> JoinHandle<InboundExit>
    where
        T: 'static,
    {
        tokio::spawn(self.run())
    }

    async fn pump(&mut self) -> InboundExit {
        loop {
            let frame = match self.transport.recv().await {
                Ok(Some(frame)) => frame,
                Ok(None) => return InboundExit::EndOfStream,
                Err(e) => return InboundExit::ReadFailed(e),
            };

            let message = match self.stamp(&frame) {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!("Skipping malformed message from {}: {}", self.id, e);
                    continue;
                }
            };

            tracing::debug!(
                "Received message from '{}' in room {}: {}",
                message.sender(),
                message.room(),
                message.content().as_str()
            );

            if let Some(repository) = &self.repository
                && let Err(e) = repository.save(&message).await
            {
                tracing::warn!("Failed to save message from {}: {}", self.id, e);
            }

            if self.hub.broadcast(Some(self.id), message).is_err() {
                return InboundExit::HubClosed;
            }
        }
    }

    /// Decode a frame and stamp the server-side fields.
    fn stamp(&self, frame: &str) -> Result<Message, DecodeError> {
        let incoming = wire::decode(frame)?;
        let sender = if incoming.sender.is_empty() {
            self.name.clone()
        } else {
            incoming.sender
        };
        let id = incoming.id.unwrap_or_else(MessageId::generate);
        Ok(Message::new(sender, self.room.clone(), incoming.content, self.clock.now()).with_id(id))
    }
}
