//! InMemory Message Repository 実装
//!
//! ドメイン層が定義する MessageRepository trait の具体的な実装。
//! ルームごとに直近 `limit` 件のメッセージだけを保持します。
//! プロセス再起動をまたいだ永続化は行いません。

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Message, MessageRepository, RepositoryError, RoomId};

/// インメモリ Message Repository 実装
pub struct InMemoryMessageRepository {
    /// ルームごとに保持する最大件数
    limit: usize,
    /// ルーム ID -> 古い順のメッセージ
    rooms: Mutex<HashMap<RoomId, VecDeque<Message>>>,
}

impl InMemoryMessageRepository {
    /// 新しい InMemoryMessageRepository を作成
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            rooms: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn save(&self, message: &Message) -> Result<(), RepositoryError> {
        if self.limit == 0 {
            return Ok(());
        }
        let mut rooms = self.rooms.lock().await;
        let history = rooms.entry(message.room().clone()).or_default();
        if history.len() == self.limit {
            history.pop_front();
        }
        history.push_back(message.clone());
        Ok(())
    }

    async fn recent(&self, room: &RoomId, limit: usize) -> Result<Vec<Message>, RepositoryError> {
        let rooms = self.rooms.lock().await;
        let Some(history) = rooms.get(room) else {
            return Ok(Vec::new());
        };
        let skip = history.len().saturating_sub(limit);
        Ok(history.iter().skip(skip).cloned().collect())
    }
}
