//! Outbound pump: client queue -> transport.

use tokio::task::JoinHandle;

use crate::{
    domain::{OutboundTransport, TransportError},
    hub::{Hub, OutboundQueue},
};

/// Why an outbound pump stopped
#[derive(Debug)]
pub enum OutboundExit {
    /// The hub closed the queue and every queued message was written
    Drained,
    /// Writing failed; the connection was unregistered
    WriteFailed(TransportError),
}

/// Drains one client's queue to its transport in receipt order.
///
/// The pump never closes the queue. It stops when the hub has closed it, or
/// after a failed write, in which case it asks the hub to unregister the
/// connection first.
pub struct OutboundPump<T> {
    queue: OutboundQueue,
    transport: T,
    hub: Hub,
}

impl<T: OutboundTransport> OutboundPump<T> {
    pub fn new(queue: OutboundQueue, transport: T, hub: Hub) -> Self {
        Self {
            queue,
            transport,
            hub,
        }
    }

    pub async fn run(mut self) -> OutboundExit {
        let id = self.queue.id();

        while let Some(message) = self.queue.recv().await {
            if let Err(e) = self.transport.send(&message).await {
                tracing::warn!("Write to {} failed: {}", id, e);
                if self.hub.unregister(id).is_err() {
                    tracing::debug!("Hub already closed, {} needs no unregistration", id);
                }
                // Best effort; the peer is most likely gone already
                let _ = self.transport.close().await;
                return OutboundExit::WriteFailed(e);
            }
        }

        tracing::debug!("Outbound queue of {} closed, closing transport", id);
        if let Err(e) = self.transport.close().await {
            tracing::debug!("Closing transport of {} failed: {}", id, e);
        }
        OutboundExit::Drained
    }

    pub fn spawn(self) -> JoinHandle<OutboundExit>
    where
        T: 'static,
    {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use chrono::Utc;
    use tokio::time::timeout;

    use super::*;
    use crate::{
        config::HubConfig,
        domain::{Message, MessageContent, MockOutboundTransport, RoomId},
    };

    const WAIT: Duration = Duration::from_secs(2);

    fn chat(content: &str) -> Message {
        Message::new(
            "server",
            RoomId::from("lobby"),
            MessageContent::try_from(content).unwrap(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_outbound_pump_writes_in_order_until_queue_closed() {
        // テスト項目: キューの内容を順番に書き込み、キューが閉じたらトランスポートを閉じて終了する
        // given (前提条件):
        let (hub, _task) = Hub::spawn(HubConfig::default());
        let (handle, queue) = hub.new_client(RoomId::from("lobby"), Some("bob".to_string()));
        let id = handle.id();
        hub.register(handle).unwrap();

        let written = Arc::new(Mutex::new(Vec::new()));
        let mut transport = MockOutboundTransport::new();
        transport.expect_send().times(3).returning({
            let written = written.clone();
            move |message| {
                written
                    .lock()
                    .unwrap()
                    .push(message.content().as_str().to_string());
                Ok(())
            }
        });
        transport.expect_close().times(1).returning(|| Ok(()));

        for content in ["one", "two", "three"] {
            hub.broadcast(None, chat(content)).unwrap();
        }
        hub.unregister(id).unwrap();

        // when (操作):
        let exit = timeout(WAIT, OutboundPump::new(queue, transport, hub.clone()).run())
            .await
            .unwrap();

        // then (期待する結果):
        assert!(matches!(exit, OutboundExit::Drained));
        assert_eq!(*written.lock().unwrap(), vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_outbound_pump_write_failure_unregisters() {
        // テスト項目: 書き込み失敗時に登録解除して終了する
        // given (前提条件):
        let (hub, _task) = Hub::spawn(HubConfig::default());
        let (handle, queue) = hub.new_client(RoomId::from("lobby"), Some("bob".to_string()));
        let liveness = handle.liveness();
        hub.register(handle).unwrap();

        let mut transport = MockOutboundTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Err(TransportError::Write("broken pipe".to_string())));
        transport.expect_close().times(1).returning(|| Ok(()));

        hub.broadcast(None, chat("doomed")).unwrap();

        // when (操作):
        let exit = timeout(WAIT, OutboundPump::new(queue, transport, hub.clone()).spawn())
            .await
            .unwrap()
            .unwrap();

        // then (期待する結果):
        assert!(matches!(exit, OutboundExit::WriteFailed(TransportError::Write(_))));
        let stats = timeout(WAIT, hub.stats()).await.unwrap().unwrap();
        assert_eq!(stats.clients, 0);
        assert!(!liveness.is_alive());
    }
}
