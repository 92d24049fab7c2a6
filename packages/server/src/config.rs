//! Runtime configuration for the hub and the server around it.

/// What the hub does when a recipient's outbound queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Drop the message for that recipient only and log it.
    #[default]
    Drop,
    /// Wait inside the hub loop until the recipient has room.
    ///
    /// One slow client stalls every broadcast while it is full. The hub's
    /// request channel is unbounded, so while it is stalled every request
    /// submitted by the pumps (broadcasts included) accumulates in memory.
    Block,
}

/// Hub behaviour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Capacity of each client's outbound queue (values below 1 are treated as 1)
    pub queue_capacity: usize,
    /// Full-queue policy
    pub overflow: OverflowPolicy,
    /// Deliver only to clients in the message's room
    pub room_scoped: bool,
    /// Also deliver a message back to the connection that sent it
    pub echo_to_sender: bool,
}

impl HubConfig {
    pub(crate) fn effective_capacity(&self) -> usize {
        self.queue_capacity.max(1)
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            overflow: OverflowPolicy::Drop,
            room_scoped: true,
            echo_to_sender: false,
        }
    }
}

/// Network-facing server settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// HTTP / WebSocket port
    pub port: u16,
    /// Optional newline-delimited JSON TCP port
    pub tcp_port: Option<u16>,
    /// Broadcast "joined" / "left" notices to the room
    pub announce_presence: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            tcp_port: None,
            announce_presence: false,
        }
    }
}
