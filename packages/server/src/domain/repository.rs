//! Message repository trait 定義
//!
//! Hub が必要とするメッセージ履歴の保存先インターフェース。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;

use super::{Message, RepositoryError, RoomId};

/// Message Repository trait
///
/// Inbound pump はブロードキャスト前にこの trait 経由でメッセージを保存する。
/// 保存の失敗は配信を止めない。
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// メッセージを保存
    async fn save(&self, message: &Message) -> Result<(), RepositoryError>;

    /// ルームの直近のメッセージを古い順で取得（最大 `limit` 件）
    async fn recent(&self, room: &RoomId, limit: usize) -> Result<Vec<Message>, RepositoryError>;
}
