//! Connection hub: the single serialization point for client registration,
//! unregistration and room-scoped broadcast.

mod api;
mod command;
mod dispatcher;
mod handle;
mod registry;

pub use api::Hub;
pub use command::HubStats;
pub use handle::{ClientHandle, Liveness, OutboundQueue};
