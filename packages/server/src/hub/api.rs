//! Caller-facing hub handle.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    config::HubConfig,
    domain::{ConnectionId, HubError, Message, RoomId},
};

use super::{
    command::{HubCommand, HubStats},
    dispatcher::Dispatcher,
    handle::{ClientHandle, OutboundQueue},
};

/// Cheaply clonable handle to a running hub.
///
/// `register`, `unregister`, `broadcast` and `shutdown` return as soon as the
/// request is queued; the dispatcher applies requests one at a time in the
/// order they were submitted.
///
/// # Example
///
/// ```ignore
/// let (hub, task) = Hub::spawn(HubConfig::default());
/// let (handle, queue) = hub.new_client(RoomId::from("lobby"), Some("alice".into()));
/// hub.register(handle)?;
/// ```
#[derive(Debug, Clone)]
pub struct Hub {
    commands: mpsc::UnboundedSender<HubCommand>,
    next_id: Arc<AtomicU64>,
    queue_capacity: usize,
}

impl Hub {
    /// Start the dispatcher task and return a handle to it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(config: HubConfig) -> (Self, JoinHandle<()>) {
        let (commands, receiver) = mpsc::unbounded_channel();
        let queue_capacity = config.effective_capacity();
        let task = tokio::spawn(Dispatcher::new(receiver, config).run());
        let hub = Self {
            commands,
            next_id: Arc::new(AtomicU64::new(1)),
            queue_capacity,
        };
        (hub, task)
    }

    /// Allocate a fresh identity and a bounded outbound queue for a new
    /// connection. The handle is not registered until passed to
    /// [`Hub::register`].
    ///
    /// Clients without a name are called `guest-<n>`.
    pub fn new_client(&self, room: RoomId, name: Option<String>) -> (ClientHandle, OutboundQueue) {
        let id = ConnectionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let name = name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| format!("guest-{}", id.value()));
        ClientHandle::new(id, room, name, self.queue_capacity)
    }

    /// Make `handle` a broadcast target.
    ///
    /// After shutdown the handle is dropped, which closes its queue.
    pub fn register(&self, handle: ClientHandle) -> Result<(), HubError> {
        self.submit(HubCommand::Register(handle))
    }

    /// Remove a client and close its queue. Unknown ids are ignored.
    pub fn unregister(&self, id: ConnectionId) -> Result<(), HubError> {
        self.submit(HubCommand::Unregister(id))
    }

    /// Fan `message` out to its room, skipping `origin`.
    pub fn broadcast(&self, origin: Option<ConnectionId>, message: Message) -> Result<(), HubError> {
        self.submit(HubCommand::Broadcast { origin, message })
    }

    /// Ask the dispatcher for a snapshot of the registry.
    pub async fn stats(&self) -> Result<HubStats, HubError> {
        let (reply, response) = oneshot::channel();
        self.submit(HubCommand::Stats(reply))?;
        response.await.map_err(|_| HubError::Closed)
    }

    /// Close every outbound queue and stop the dispatcher.
    ///
    /// Requests already applied are not undone; requests queued behind the
    /// shutdown are discarded.
    pub fn shutdown(&self) -> Result<(), HubError> {
        self.submit(HubCommand::Shutdown)
    }

    /// `true` once the dispatcher no longer accepts requests
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    fn submit(&self, command: HubCommand) -> Result<(), HubError> {
        self.commands.send(command).map_err(|_| HubError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use tokio::time::timeout;

    use super::*;
    use crate::{config::OverflowPolicy, domain::MessageContent};

    const WAIT: Duration = Duration::from_secs(2);

    fn chat(sender: &str, room: &str, content: &str) -> Message {
        Message::new(
            sender,
            RoomId::from(room),
            MessageContent::try_from(content).unwrap(),
            Utc::now(),
        )
    }

    fn join(hub: &Hub, room: &str, name: &str) -> (ConnectionId, OutboundQueue) {
        let (handle, queue) = hub.new_client(RoomId::from(room), Some(name.to_string()));
        let id = handle.id();
        hub.register(handle).unwrap();
        (id, queue)
    }

    async fn recv(queue: &mut OutboundQueue) -> Option<Message> {
        timeout(WAIT, queue.recv()).await.expect("timed out waiting for queue")
    }

    #[tokio::test]
    async fn test_broadcast_reaches_room_peers_but_not_sender() {
        // テスト項目: 同じルームの他クライアントだけがメッセージを受信する
        // given (前提条件):
        let (hub, _task) = Hub::spawn(HubConfig::default());
        let (a, mut a_queue) = join(&hub, "lobby", "A");
        let (_b, mut b_queue) = join(&hub, "lobby", "B");

        // when (操作):
        hub.broadcast(Some(a), chat("A", "lobby", "hello")).unwrap();
        hub.stats().await.unwrap();

        // then (期待する結果):
        let received = recv(&mut b_queue).await.unwrap();
        assert_eq!(received.content().as_str(), "hello");
        assert_eq!(received.sender(), "A");
        assert!(b_queue.try_recv().is_none());
        assert!(a_queue.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_broadcast_does_not_cross_rooms() {
        // テスト項目: 別ルームのクライアントには配信されない
        // given (前提条件):
        let (hub, _task) = Hub::spawn(HubConfig::default());
        let (a, _a_queue) = join(&hub, "lobby", "A");
        let (_c, mut c_queue) = join(&hub, "other", "C");

        // when (操作):
        hub.broadcast(Some(a), chat("A", "lobby", "hi")).unwrap();
        hub.stats().await.unwrap();

        // then (期待する結果):
        assert!(c_queue.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_unregister_removes_client_and_closes_queue() {
        // テスト項目: 登録解除でレジストリから消え、キューが閉じられ、以降は配信されない
        // given (前提条件):
        let (hub, _task) = Hub::spawn(HubConfig::default());
        let (a, mut a_queue) = join(&hub, "lobby", "A");
        let (b, _b_queue) = join(&hub, "lobby", "B");

        // when (操作):
        hub.unregister(a).unwrap();
        hub.broadcast(Some(b), chat("B", "lobby", "still there?")).unwrap();
        let stats = timeout(WAIT, hub.stats()).await.unwrap().unwrap();

        // then (期待する結果):
        assert_eq!(stats.clients, 1);
        assert_eq!(stats.rooms.get("lobby"), Some(&1));
        assert!(recv(&mut a_queue).await.is_none());
    }

    #[tokio::test]
    async fn test_burst_order_is_preserved_for_every_recipient() {
        // テスト項目: 100 件の連続ブロードキャストが全受信者で送信順に届く
        // given (前提条件):
        let (hub, _task) = Hub::spawn(HubConfig {
            queue_capacity: 128,
            ..HubConfig::default()
        });
        let (_a, mut a_queue) = join(&hub, "lobby", "A");
        let (_b, mut b_queue) = join(&hub, "lobby", "B");
        let (_c, mut c_queue) = join(&hub, "lobby", "C");
        let (origin, _origin_queue) = join(&hub, "lobby", "origin");

        // when (操作):
        for i in 0..100 {
            hub.broadcast(Some(origin), chat("origin", "lobby", &i.to_string()))
                .unwrap();
        }

        // then (期待する結果):
        for queue in [&mut a_queue, &mut b_queue, &mut c_queue] {
            for expected in 0..100 {
                let message = recv(queue).await.unwrap();
                assert_eq!(message.content().as_str(), expected.to_string());
            }
        }
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_stalling_other_rooms() {
        // テスト項目: 満杯のキューがあっても別ルームへのブロードキャストは遅延しない
        // given (前提条件):
        let (hub, _task) = Hub::spawn(HubConfig {
            queue_capacity: 1,
            overflow: OverflowPolicy::Drop,
            ..HubConfig::default()
        });
        let (_slow, _slow_queue) = join(&hub, "slow", "paused");
        let (_fast, mut fast_queue) = join(&hub, "fast", "reader");
        for i in 0..5 {
            hub.broadcast(None, chat("x", "slow", &format!("flood {i}")))
                .unwrap();
        }

        // when (操作):
        hub.broadcast(None, chat("y", "fast", "ping")).unwrap();
        let stats = timeout(Duration::from_millis(500), hub.stats())
            .await
            .expect("hub stalled")
            .unwrap();

        // then (期待する結果):
        assert_eq!(recv(&mut fast_queue).await.unwrap().content().as_str(), "ping");
        assert_eq!(stats.dropped_messages, 4);
        assert_eq!(stats.clients, 2);
    }

    #[tokio::test]
    async fn test_block_policy_delivers_everything_in_order() {
        // テスト項目: block ポリシーでは容量 1 でも全件が順番に届く
        // given (前提条件):
        let (hub, _task) = Hub::spawn(HubConfig {
            queue_capacity: 1,
            overflow: OverflowPolicy::Block,
            ..HubConfig::default()
        });
        let (_reader, mut queue) = join(&hub, "lobby", "reader");

        // when (操作):
        for i in 0..10 {
            hub.broadcast(None, chat("server", "lobby", &i.to_string()))
                .unwrap();
        }

        // then (期待する結果):
        for expected in 0..10 {
            let message = recv(&mut queue).await.unwrap();
            assert_eq!(message.content().as_str(), expected.to_string());
        }
        let stats = timeout(WAIT, hub.stats()).await.unwrap().unwrap();
        assert_eq!(stats.dropped_messages, 0);
    }

    #[tokio::test]
    async fn test_concurrent_double_unregister_is_noop() {
        // テスト項目: 同じクライアントを並行して 2 回登録解除してもエラーにならない
        // given (前提条件):
        let (hub, _task) = Hub::spawn(HubConfig::default());
        let (handle, mut queue) = hub.new_client(RoomId::from("lobby"), None);
        let id = handle.id();
        let liveness = handle.liveness();
        hub.register(handle).unwrap();

        // when (操作):
        let first = tokio::spawn({
            let hub = hub.clone();
            async move { hub.unregister(id) }
        });
        let second = tokio::spawn({
            let hub = hub.clone();
            async move { hub.unregister(id) }
        });
        let results = (first.await.unwrap(), second.await.unwrap());
        let stats = timeout(WAIT, hub.stats()).await.unwrap().unwrap();

        // then (期待する結果):
        assert_eq!(results, (Ok(()), Ok(())));
        assert_eq!(stats.clients, 0);
        assert!(recv(&mut queue).await.is_none());
        assert!(!liveness.is_alive());
    }

    #[tokio::test]
    async fn test_unregister_unknown_client_is_noop() {
        // テスト項目: 未登録のクライアントの登録解除は何もしない
        // given (前提条件):
        let (hub, _task) = Hub::spawn(HubConfig::default());
        let (_a, _a_queue) = join(&hub, "lobby", "A");

        // when (操作):
        let result = hub.unregister(ConnectionId::new(9_999));
        let stats = timeout(WAIT, hub.stats()).await.unwrap().unwrap();

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(stats.clients, 1);
    }

    #[tokio::test]
    async fn test_client_with_dropped_queue_is_pruned() {
        // テスト項目: 受信側が消えたクライアントは次の配信時に除去される
        // given (前提条件):
        let (hub, _task) = Hub::spawn(HubConfig::default());
        let (_gone, gone_queue) = join(&hub, "lobby", "gone");
        drop(gone_queue);

        // when (操作):
        hub.broadcast(None, chat("server", "lobby", "anyone?")).unwrap();
        let stats = timeout(WAIT, hub.stats()).await.unwrap().unwrap();

        // then (期待する結果):
        assert_eq!(stats.clients, 0);
    }

    #[tokio::test]
    async fn test_shutdown_closes_queues_and_rejects_requests() {
        // テスト項目: シャットダウンで全キューが閉じ、以降のリクエストは拒否される
        // given (前提条件):
        let (hub, task) = Hub::spawn(HubConfig::default());
        let (_a, mut a_queue) = join(&hub, "lobby", "A");
        let (_b, mut b_queue) = join(&hub, "other", "B");

        // when (操作):
        hub.shutdown().unwrap();
        timeout(WAIT, task).await.unwrap().unwrap();

        // then (期待する結果):
        assert!(recv(&mut a_queue).await.is_none());
        assert!(recv(&mut b_queue).await.is_none());
        assert!(hub.is_closed());

        let (late, mut late_queue) = hub.new_client(RoomId::global(), None);
        let late_liveness = late.liveness();
        assert_eq!(hub.register(late), Err(HubError::Closed));
        assert!(!late_liveness.is_alive());
        assert!(recv(&mut late_queue).await.is_none());
        assert_eq!(hub.stats().await, Err(HubError::Closed));
    }

    #[tokio::test]
    async fn test_new_client_allocates_unique_ids_and_guest_names() {
        // テスト項目: new_client は重複しない ID と guest 名を割り当てる
        // given (前提条件):
        let (hub, _task) = Hub::spawn(HubConfig::default());

        // when (操作):
        let (first, _q1) = hub.new_client(RoomId::global(), None);
        let (second, _q2) = hub.new_client(RoomId::global(), Some("  ".to_string()));
        let (named, _q3) = hub.new_client(RoomId::global(), Some("alice".to_string()));

        // then (期待する結果):
        assert_ne!(first.id(), second.id());
        assert_eq!(first.name(), format!("guest-{}", first.id().value()));
        assert_eq!(second.name(), format!("guest-{}", second.id().value()));
        assert_eq!(named.name(), "alice");
    }
}
