//! Server execution logic.

use std::{future::Future, sync::Arc};

use agora_shared::time::{Clock, SystemClock};
use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{config::ServerConfig, domain::MessageRepository, hub::Hub};

use super::{
    handler::{get_messages, get_rooms, health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
    tcp::serve_tcp,
};

/// HTTP / WebSocket (and optionally TCP) front end of a running hub
///
/// # Example
///
/// ```ignore
/// let (hub, hub_task) = Hub::spawn(HubConfig::default());
/// let server = Server::new(hub, ServerConfig::default())
///     .with_repository(Arc::new(InMemoryMessageRepository::new(100)));
/// server.run().await?;
/// hub_task.await?;
/// ```
pub struct Server {
    hub: Hub,
    config: ServerConfig,
    repository: Option<Arc<dyn MessageRepository>>,
    clock: Arc<dyn Clock>,
}

impl Server {
    pub fn new(hub: Hub, config: ServerConfig) -> Self {
        Self {
            hub,
            config,
            repository: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Keep message history in `repository` and serve it on `/api/messages`
    pub fn with_repository(mut self, repository: Arc<dyn MessageRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Bind the configured addresses and serve until Ctrl+C / SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if binding fails or the server stops abnormally.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&bind_addr).await?;

        let tcp_listener = match self.config.tcp_port {
            Some(port) => Some(TcpListener::bind((self.config.host.as_str(), port)).await?),
            None => None,
        };

        tracing::info!("Agora hub listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws?room=<room>&client_id=<name>", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, tcp_listener, shutdown_signal()).await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Serve on already-bound listeners until `shutdown` resolves.
    ///
    /// When `shutdown` resolves the hub is shut down first, which closes every
    /// outbound queue and lets each connection finish on its own.
    pub async fn serve<F>(
        self,
        listener: TcpListener,
        tcp_listener: Option<TcpListener>,
        shutdown: F,
    ) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let state = Arc::new(AppState {
            hub: self.hub.clone(),
            repository: self.repository,
            clock: self.clock,
            announce_presence: self.config.announce_presence,
        });

        let tcp_task = tcp_listener.map(|listener| tokio::spawn(serve_tcp(listener, state.clone())));

        let app = Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/rooms", get(get_rooms))
            .route("/api/messages", get(get_messages))
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        let hub = self.hub.clone();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                if hub.shutdown().is_err() {
                    tracing::debug!("Hub was already closed");
                }
            })
            .await;

        if let Some(task) = tcp_task {
            task.abort();
        }
        // Also covers the case where serving failed before any signal
        if self.hub.shutdown().is_err() {
            tracing::debug!("Hub was already closed");
        }

        result
    }
}
