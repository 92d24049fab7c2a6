//! Server state shared by every handler.

use std::sync::Arc;

use agora_shared::time::Clock;

use crate::{domain::MessageRepository, hub::Hub};

/// Shared application state
pub struct AppState {
    /// Hub（接続レジストリとブロードキャストの唯一の窓口）
    pub hub: Hub,
    /// Message history, if enabled
    pub repository: Option<Arc<dyn MessageRepository>>,
    /// Clock used to stamp inbound messages and notices
    pub clock: Arc<dyn Clock>,
    /// Broadcast "joined" / "left" notices
    pub announce_presence: bool,
}
