//! Per-connection pumps moving messages between a transport and the hub.

mod inbound;
mod outbound;

pub use inbound::{InboundExit, InboundPump};
pub use outbound::{OutboundExit, OutboundPump};
