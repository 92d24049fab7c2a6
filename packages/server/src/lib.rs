//! Connection hub and room-scoped broadcast dispatcher.
//!
//! A single [`hub::Hub`] task owns every registered connection. Each
//! connection runs an inbound pump (transport -> hub) and an outbound pump
//! (bounded per-client queue -> transport), served over WebSocket and,
//! optionally, newline-delimited JSON over TCP.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;

// hub core
pub mod config;
pub mod hub;
pub mod pump;
pub mod wire;
