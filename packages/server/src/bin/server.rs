//! Chat hub server with room-scoped broadcast.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin agora-server
//! cargo run --bin agora-server -- --host 0.0.0.0 --port 3000 --tcp-port 3001
//! ```

use std::sync::Arc;

use agora_server::{
    config::{HubConfig, OverflowPolicy, ServerConfig},
    hub::Hub,
    infrastructure::repository::InMemoryMessageRepository,
    ui::Server,
};
use agora_shared::logger::setup_logger;
use clap::{Parser, ValueEnum};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Overflow {
    /// Drop the message for a client whose queue is full
    Drop,
    /// Wait until the client's queue has room
    Block,
}

impl From<Overflow> for OverflowPolicy {
    fn from(value: Overflow) -> Self {
        match value {
            Overflow::Drop => OverflowPolicy::Drop,
            Overflow::Block => OverflowPolicy::Block,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "agora-server")]
#[command(about = "Chat hub with room-scoped broadcast over WebSocket and TCP", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number for HTTP / WebSocket
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Port number for newline-delimited JSON over TCP (disabled if omitted)
    #[arg(long)]
    tcp_port: Option<u16>,

    /// Capacity of each client's outbound queue
    #[arg(long, default_value = "64")]
    queue_capacity: usize,

    /// What to do when a client's outbound queue is full
    #[arg(long, value_enum, default_value = "drop")]
    overflow: Overflow,

    /// Deliver every message to every client regardless of room
    #[arg(long)]
    no_room_scoping: bool,

    /// Also deliver messages back to their sender
    #[arg(long)]
    echo_to_sender: bool,

    /// Messages kept per room for /api/messages (0 disables history)
    #[arg(long, default_value = "100")]
    history_limit: usize,

    /// Broadcast "joined" / "left" notices
    #[arg(long)]
    announce_presence: bool,
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let hub_config = HubConfig {
        queue_capacity: args.queue_capacity,
        overflow: args.overflow.into(),
        room_scoped: !args.no_room_scoping,
        echo_to_sender: args.echo_to_sender,
    };
    tracing::debug!("Hub config: {:?}", hub_config);
    let (hub, hub_task) = Hub::spawn(hub_config);

    let server_config = ServerConfig {
        host: args.host,
        port: args.port,
        tcp_port: args.tcp_port,
        announce_presence: args.announce_presence,
    };
    let mut server = Server::new(hub, server_config);
    if args.history_limit > 0 {
        server = server.with_repository(Arc::new(InMemoryMessageRepository::new(
            args.history_limit,
        )));
    }

    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = hub_task.await {
        tracing::error!("Hub task failed: {}", e);
        std::process::exit(1);
    }
}
