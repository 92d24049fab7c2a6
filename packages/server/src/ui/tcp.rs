//! Newline-delimited JSON over plain TCP.
//!
//! Every TCP client joins the global room and is named after its peer address.

use std::{io, net::SocketAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpStream};

use crate::{
    domain::RoomId,
    infrastructure::transport::{LinesInbound, LinesOutbound},
};

use super::{session::serve_connection, state::AppState};

/// Pause after a failed accept (e.g. out of file descriptors)
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Source of accepted TCP connections
#[async_trait]
trait Acceptor: Send {
    async fn accept(&mut self) -> io::Result<(TcpStream, SocketAddr)>;
}

#[async_trait]
impl Acceptor for TcpListener {
    async fn accept(&mut self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }
}

/// Accept TCP clients until the hub closes.
pub async fn serve_tcp(listener: TcpListener, state: Arc<AppState>) -> io::Result<()> {
    tracing::info!("TCP line listener on {}", listener.local_addr()?);
    accept_loop(listener, state).await;
    Ok(())
}

/// A failed accept is logged and retried; it never stops the listener.
async fn accept_loop<A: Acceptor>(mut acceptor: A, state: Arc<AppState>) {
    loop {
        let (stream, peer) = match acceptor.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!("Failed to accept TCP connection: {}", e);
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        if state.hub.is_closed() {
            tracing::info!("Hub closed, stopping TCP listener");
            return;
        }
        tracing::debug!("Accepted TCP connection from {}", peer);

        let (reader, writer) = stream.into_split();
        let state = state.clone();
        tokio::spawn(async move {
            serve_connection(
                state,
                RoomId::global(),
                Some(peer.to_string()),
                LinesInbound::new(reader),
                LinesOutbound::new(writer),
            )
            .await;
        });
    }
}
