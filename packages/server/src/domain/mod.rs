//! Domain layer: messages, identities, errors and the collaborator traits
//! (transport, repository) the hub core depends on.

pub mod entity;
pub mod error;
pub mod repository;
pub mod transport;
pub mod value_object;

pub use entity::{Message, SERVER_SENDER};
pub use error::{DecodeError, HubError, RepositoryError, TransportError, ValueObjectError};
pub use repository::MessageRepository;
pub use transport::{InboundTransport, OutboundTransport};
pub use value_object::{ConnectionId, MAX_CONTENT_CHARS, MessageContent, MessageId, RoomId};

#[cfg(test)]
pub use transport::MockOutboundTransport;
