//! Client handle and its outbound queue.
//!
//! The handle owns the only sender of the outbound queue. Dropping the handle
//! is therefore the one and only way the queue gets closed, which the hub does
//! when it removes the handle from its registry.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::sync::mpsc::{
    self,
    error::{SendError, TrySendError},
};

use crate::domain::{ConnectionId, Message, RoomId};

/// Shared view of whether a handle's queue is still open.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// `false` once the hub has dropped the handle and closed its queue
    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn mark_dead(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The hub's record of one connection
#[derive(Debug)]
pub struct ClientHandle {
    id: ConnectionId,
    room: RoomId,
    name: String,
    sender: mpsc::Sender<Message>,
    liveness: Liveness,
}

impl ClientHandle {
    /// Create a handle together with the receiving end of its bounded queue.
    pub fn new(
        id: ConnectionId,
        room: RoomId,
        name: impl Into<String>,
        capacity: usize,
    ) -> (Self, OutboundQueue) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let handle = Self {
            id,
            room,
            name: name.into(),
            sender,
            liveness: Liveness::new(),
        };
        let queue = OutboundQueue { id, receiver };
        (handle, queue)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    pub(crate) fn try_enqueue(&self, message: Message) -> Result<(), TrySendError<Message>> {
        self.sender.try_send(message)
    }

    pub(crate) async fn enqueue(&self, message: Message) -> Result<(), SendError<Message>> {
        self.sender.send(message).await
    }
}

impl Drop for ClientHandle {
    fn drop(&mut self) {
        self.liveness.mark_dead();
    }
}

/// Receiving end of a client's outbound queue, owned by its outbound pump.
#[derive(Debug)]
pub struct OutboundQueue {
    id: ConnectionId,
    receiver: mpsc::Receiver<Message>,
}

impl OutboundQueue {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Next queued message; `None` once the queue is closed and drained
    pub async fn recv(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }

    /// Next queued message if one is ready, without waiting
    #[cfg(test)]
    pub(crate) fn try_recv(&mut self) -> Option<Message> {
        self.receiver.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MessageContent;
    use chrono::Utc;

    fn message(content: &str) -> Message {
        Message::new(
            "alice",
            RoomId::from("lobby"),
            MessageContent::try_from(content).unwrap(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_dropping_handle_closes_queue_after_drain() {
        // テスト項目: ハンドルを破棄するとキューは残りを配信した後に閉じる
        // given (前提条件):
        let (handle, mut queue) = ClientHandle::new(ConnectionId::new(1), RoomId::global(), "a", 4);
        handle.try_enqueue(message("one")).unwrap();
        let liveness = handle.liveness();

        // when (操作):
        drop(handle);

        // then (期待する結果):
        assert!(!liveness.is_alive());
        assert_eq!(queue.recv().await.unwrap().content().as_str(), "one");
        assert!(queue.recv().await.is_none());
    }

    #[test]
    fn test_try_enqueue_reports_full_queue() {
        // テスト項目: 容量を超えると Full エラーが返る
        // given (前提条件):
        let (handle, _queue) = ClientHandle::new(ConnectionId::new(1), RoomId::global(), "a", 1);
        handle.try_enqueue(message("one")).unwrap();

        // when (操作):
        let result = handle.try_enqueue(message("two"));

        // then (期待する結果):
        assert!(matches!(result, Err(TrySendError::Full(_))));
    }

    #[test]
    fn test_try_enqueue_reports_closed_queue() {
        // テスト項目: 受信側が破棄されていると Closed エラーが返る
        // given (前提条件):
        let (handle, queue) = ClientHandle::new(ConnectionId::new(1), RoomId::global(), "a", 1);
        drop(queue);

        // when (操作):
        let result = handle.try_enqueue(message("one"));

        // then (期待する結果):
        assert!(matches!(result, Err(TrySendError::Closed(_))));
    }
}
