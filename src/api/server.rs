//! API Server
//!
//! Binds the REST router and serves it until a shutdown signal arrives.

use crate::error::{Error, Result};
use crate::storcli::InventoryRef;
use std::net::SocketAddr;
use tokio::sync::broadcast;
use tracing::info;

use super::rest::RestRouter;

// =============================================================================
// Server Configuration
// =============================================================================

/// Configuration for the API server
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// REST API bind address
    pub listen_addr: SocketAddr,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

// =============================================================================
// API Server
// =============================================================================

/// REST API server over an inventory
pub struct ApiServer {
    config: ApiServerConfig,
    inventory: InventoryRef,
    shutdown_tx: broadcast::Sender<()>,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig, inventory: InventoryRef) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            inventory,
            shutdown_tx,
        }
    }

    /// Serve until [`ApiServer::shutdown`] is called
    pub async fn run(&self) -> Result<()> {
        let app = RestRouter::new(self.inventory.clone()).build();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let listener = tokio::net::TcpListener::bind(self.config.listen_addr)
            .await
            .map_err(|e| Error::Configuration(format!("Failed to bind {}: {}", self.config.listen_addr, e)))?;
        info!("REST API listening on {}", self.config.listen_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("REST server shutting down");
            })
            .await
            .map_err(|e| Error::Internal(format!("REST server error: {}", e)))?;

        Ok(())
    }

    /// Handle that triggers graceful shutdown
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Trigger graceful shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}
