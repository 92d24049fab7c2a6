//! Message entity.

use chrono::{DateTime, Utc};

use super::value_object::{MessageContent, MessageId, RoomId};

/// Sender name used for server-authored notices.
pub const SERVER_SENDER: &str = "server";

/// Immutable chat message routed by the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    id: Option<MessageId>,
    sender: String,
    room: RoomId,
    content: MessageContent,
    timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(
        sender: impl Into<String>,
        room: RoomId,
        content: MessageContent,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            sender: sender.into(),
            room,
            content,
            timestamp,
        }
    }

    /// Server-authored message, e.g. a presence notice
    pub fn notice(room: RoomId, content: MessageContent, timestamp: DateTime<Utc>) -> Self {
        Self::new(SERVER_SENDER, room, content, timestamp).with_id(MessageId::generate())
    }

    /// Return a copy of this message carrying `id`
    pub fn with_id(self, id: MessageId) -> Self {
        Self {
            id: Some(id),
            ..self
        }
    }

    pub fn id(&self) -> Option<&MessageId> {
        self.id.as_ref()
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    pub fn content(&self) -> &MessageContent {
        &self.content
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_is_authored_by_server_and_has_id() {
        // テスト項目: サーバー通知は送信者が "server" で ID を持つ
        // given (前提条件):
        let content = MessageContent::try_from("alice joined").unwrap();

        // when (操作):
        let notice = Message::notice(RoomId::from("lobby"), content, Utc::now());

        // then (期待する結果):
        assert_eq!(notice.sender(), SERVER_SENDER);
        assert!(notice.id().is_some());
        assert_eq!(notice.room().as_str(), "lobby");
    }

    #[test]
    fn test_with_id_keeps_other_fields() {
        // テスト項目: with_id は ID 以外のフィールドを変更しない
        // given (前提条件):
        let timestamp = Utc::now();
        let message = Message::new(
            "alice",
            RoomId::global(),
            MessageContent::try_from("hi").unwrap(),
            timestamp,
        );

        // when (操作):
        let stamped = message.clone().with_id(MessageId::from("m-1".to_string()));

        // then (期待する結果):
        assert_eq!(stamped.id().map(MessageId::as_str), Some("m-1"));
        assert_eq!(stamped.sender(), message.sender());
        assert_eq!(stamped.content(), message.content());
        assert_eq!(stamped.timestamp(), timestamp);
    }
}
