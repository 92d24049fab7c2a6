//! Transport boundary traits.
//!
//! A transport turns bytes into discrete frames and messages back into bytes.
//! Framing and encoding live behind these traits; the pumps only see frames
//! and [`Message`] values.

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::{Message, TransportError};

/// Read side of one connection
#[async_trait]
pub trait InboundTransport: Send {
    /// Wait for the next text frame.
    ///
    /// `Ok(None)` means the peer ended the stream cleanly.
    async fn recv(&mut self) -> Result<Option<String>, TransportError>;
}

/// Write side of one connection
#[cfg_attr(test, automock)]
#[async_trait]
pub trait OutboundTransport: Send {
    /// Serialize and write one message
    async fn send(&mut self, message: &Message) -> Result<(), TransportError>;

    /// Close the underlying connection after the last write
    async fn close(&mut self) -> Result<(), TransportError>;
}
