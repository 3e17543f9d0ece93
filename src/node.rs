use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::access::AccessPolicy;
use crate::config::ServerConfig;
use crate::http::{run_http, ApiState};
use crate::persistence::{restore_store, JsonFileGateway, SnapshotGateway, SnapshotWriter};
use crate::scheduler::SwarmStore;
use crate::service::QuarryService;

/// The swarm host: store, snapshot writer and HTTP server.
pub struct Node {
    pub config: ServerConfig,
    pub store: Arc<SwarmStore>,
    pub service: QuarryService,
    writer: SnapshotWriter,
}

impl Node {
    /// Build a node persisting to `config.data_file`.
    pub fn new(config: ServerConfig) -> Self {
        let gateway = Arc::new(JsonFileGateway::new(config.data_file.clone()));
        Self::with_gateway(config, gateway)
    }

    /// Build a node on top of any snapshot gateway. Loads the last snapshot
    /// (or writes an empty one) before returning.
    pub fn with_gateway(config: ServerConfig, gateway: Arc<dyn SnapshotGateway>) -> Self {
        let store = Arc::new(restore_store(gateway.as_ref()));
        let (writer, persist) = SnapshotWriter::new(store.clone(), gateway);
        let service = QuarryService::new(
            store.clone(),
            AccessPolicy::new(config.access.clone()),
            persist,
        );

        Self {
            config,
            store,
            service,
            writer,
        }
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// 1. Spawns the snapshot writer
    /// 2. Serves HTTP until shutdown, letting in-flight requests finish
    /// 3. Flushes a final snapshot and waits for the writer to stop
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP listener cannot be bound or fails.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), Box<dyn std::error::Error>> {
        let Node {
            config,
            store,
            service,
            writer,
        } = self;

        let writer_handle = tokio::spawn(writer.run());

        let persist = service.persist().clone();
        let state = ApiState { service };
        let served = run_http(config.listen_addr, state, shutdown).await;

        let swarms = store.len().await;
        tracing::info!(swarms, "Writing final snapshot");
        if !persist.flush().await {
            tracing::warn!("Final snapshot was not written");
        }
        drop(persist);
        if let Err(e) = writer_handle.await {
            tracing::error!(error = %e, "Snapshot writer panicked");
        }

        served?;
        Ok(())
    }
}
