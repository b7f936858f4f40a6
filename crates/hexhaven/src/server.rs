//! `HexhavenServer` builder and server loop.
//!
//! Ties the layers together: transport → protocol → room registry.

use std::future::Future;
use std::sync::Arc;

use hexhaven_protocol::{Codec, JsonCodec};
use hexhaven_room::{
    Catalog, HistoryRecorder, InMemoryCatalog, RoomConfig, RoomRegistry, TracingRecorder,
};
use hexhaven_transport::{Transport, WebSocketTransport};

use crate::config::read_file;
use crate::handler::handle_connection;
use crate::{HexhavenError, ServerConfig};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) registry: Arc<RoomRegistry>,
    pub(crate) codec: C,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a Hexhaven server.
///
/// ```rust,no_run
/// # async fn run() -> Result<(), hexhaven::HexhavenError> {
/// let server = hexhaven::HexhavenServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct HexhavenServerBuilder {
    config: ServerConfig,
    catalog: Option<Arc<dyn Catalog>>,
    recorder: Option<Arc<dyn HistoryRecorder>>,
}

impl HexhavenServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            catalog: None,
            recorder: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room = config;
        self
    }

    /// Uses `catalog` instead of the configured file or the demo set.
    pub fn catalog(mut self, catalog: impl Catalog) -> Self {
        self.catalog = Some(Arc::new(catalog));
        self
    }

    pub fn recorder(mut self, recorder: impl HistoryRecorder) -> Self {
        self.recorder = Some(Arc::new(recorder));
        self
    }

    /// Loads the catalog and binds the listener.
    ///
    /// # Errors
    /// Fails if the catalog file is unreadable or the address can't be
    /// bound.
    pub async fn build(self) -> Result<HexhavenServer<JsonCodec>, HexhavenError> {
        let catalog: Arc<dyn Catalog> = match (self.catalog, &self.config.catalog_path) {
            (Some(catalog), _) => catalog,
            (None, Some(path)) => {
                let catalog = InMemoryCatalog::from_json(&read_file(path)?)?;
                tracing::info!(path = %path.display(), "catalog loaded");
                Arc::new(catalog)
            }
            (None, None) => Arc::new(InMemoryCatalog::demo()),
        };
        let recorder: Arc<dyn HistoryRecorder> = match self.recorder {
            Some(recorder) => recorder,
            None => Arc::new(TracingRecorder),
        };

        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;
        let registry = Arc::new(RoomRegistry::new(
            self.config.room.clone(),
            catalog,
            recorder,
        ));

        let state = Arc::new(ServerState {
            registry,
            codec: JsonCodec,
            config: self.config,
        });
        Ok(HexhavenServer { transport, state })
    }
}

impl Default for HexhavenServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Hexhaven server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct HexhavenServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl HexhavenServer<JsonCodec> {
    pub fn builder() -> HexhavenServerBuilder {
        HexhavenServerBuilder::new()
    }
}

impl<C: Codec> HexhavenServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.state.registry
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), HexhavenError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` resolves, then stops every
    /// room.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), HexhavenError> {
        let sweeper = self
            .state
            .registry
            .spawn_sweeper(self.state.config.sweep_interval());
        tracing::info!(addr = ?self.local_addr().ok(), "Hexhaven server running");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
                () = &mut shutdown => break,
            }
        }

        tracing::info!("Hexhaven server shutting down");
        sweeper.abort();
        self.state.registry.shutdown_all().await;
        Ok(())
    }
}
