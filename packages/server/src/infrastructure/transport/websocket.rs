//! WebSocket を使った transport 実装
//!
//! ## 責務
//!
//! - axum の `WebSocket` を読み込み側と書き込み側に分割
//! - テキストフレーム 1 つを 1 メッセージとして扱う
//!
//! ping/pong は WebSocket プロトコルが自動で処理し、バイナリフレームは無視する。
//! close フレームはストリーム終了として扱う。

use async_trait::async_trait;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};

use crate::{
    domain::{InboundTransport, Message, OutboundTransport, TransportError},
    wire,
};

/// WebSocket の読み込み側
pub struct WebSocketInbound {
    stream: SplitStream<WebSocket>,
}

/// WebSocket の書き込み側
pub struct WebSocketOutbound {
    sink: SplitSink<WebSocket, WsMessage>,
}

/// Split an upgraded socket into its inbound and outbound transports
pub fn split(socket: WebSocket) -> (WebSocketInbound, WebSocketOutbound) {
    let (sink, stream) = socket.split();
    (WebSocketInbound { stream }, WebSocketOutbound { sink })
}

#[async_trait]
impl InboundTransport for WebSocketInbound {
    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        while let Some(frame) = self.stream.next().await {
            match frame.map_err(|e| TransportError::Read(e.to_string()))? {
                WsMessage::Text(text) => return Ok(Some(text.as_str().to_owned())),
                WsMessage::Close(_) => return Ok(None),
                WsMessage::Ping(_) | WsMessage::Pong(_) => {
                    tracing::trace!("Received ping/pong");
                }
                WsMessage::Binary(bytes) => {
                    tracing::debug!("Ignoring binary frame ({} bytes)", bytes.len());
                }
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl OutboundTransport for WebSocketOutbound {
    async fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        let json = wire::encode(message).map_err(|e| TransportError::Write(e.to_string()))?;
        self.sink
            .send(WsMessage::Text(json.into()))
            .await
            .map_err(|e| TransportError::Write(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.sink
            .close()
            .await
            .map_err(|e| TransportError::Write(e.to_string()))
    }
}
