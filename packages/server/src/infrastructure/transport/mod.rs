//! Transport 実装
//!
//! - `websocket`: axum の WebSocket を使った実装
//! - `lines`: 改行区切り JSON（TCP など任意のバイトストリーム）

pub mod lines;
pub mod websocket;

pub use lines::{LinesInbound, LinesOutbound};
pub use websocket::{WebSocketInbound, WebSocketOutbound};
