//! JSON wire shape of a message.
//!
//! Outbound:
//!
//! ```json
//! { "id": "…", "content": "hello", "sender": "alice", "room": "lobby",
//!   "timestamp": "2024-05-01T12:00:00.000Z" }
//! ```
//!
//! Inbound frames use the same shape but only `content` is required. `room`
//! and `timestamp` are ignored because the server stamps them.

use agora_shared::time::to_rfc3339;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DecodeError, Message, MessageContent, MessageId};

/// Message as serialized to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub content: String,
    pub sender: String,
    pub room: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

fn serialize_timestamp<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&to_rfc3339(timestamp))
}

impl From<&Message> for MessageDto {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id().map(|id| id.as_str().to_string()),
            content: message.content().as_str().to_string(),
            sender: message.sender().to_string(),
            room: message.room().as_str().to_string(),
            timestamp: message.timestamp(),
        }
    }
}

/// Client-submitted frame
#[derive(Debug, Deserialize)]
struct IncomingMessageDto {
    #[serde(default)]
    id: Option<String>,
    content: String,
    #[serde(default)]
    sender: String,
}

/// Decoded client message, before the server stamps room and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub id: Option<MessageId>,
    pub sender: String,
    pub content: MessageContent,
}

/// Parse one inbound frame.
pub fn decode(frame: &str) -> Result<IncomingMessage, DecodeError> {
    let dto: IncomingMessageDto = serde_json::from_str(frame)?;
    Ok(IncomingMessage {
        id: dto.id.filter(|id| !id.is_empty()).map(MessageId::from),
        sender: dto.sender.trim().to_string(),
        content: MessageContent::new(dto.content)?,
    })
}

/// Serialize a message for the wire.
pub fn encode(message: &Message) -> Result<String, serde_json::Error> {
    serde_json::to_string(&MessageDto::from(message))
}
