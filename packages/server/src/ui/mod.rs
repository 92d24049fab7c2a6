//! Network front end: axum routes, the TCP listener and per-connection sessions.

mod handler;
mod server;
mod session;
mod signal;
pub mod state;
mod tcp;

pub use server::Server;
pub use session::serve_connection;
pub use signal::shutdown_signal;
