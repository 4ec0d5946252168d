//! REST API server lifecycle management.
//!
//! Wraps the router in a start/stop handle so the server can run
//! embedded (integration tests bind port 0 and read back the actual
//! port) or standalone from the CLI.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::rest::{build_router, ApiState};

/// Status of the REST API server
#[derive(Debug, Clone, PartialEq)]
pub enum RestApiStatus {
    Stopped,
    Stopping,
    Running { port: u16 },
}

impl RestApiStatus {
    /// Returns true if the server is running
    pub fn is_running(&self) -> bool {
        matches!(self, RestApiStatus::Running { .. })
    }
}

/// REST API server handle for lifecycle management
pub struct RestApiServer {
    state: ApiState,
    status: Arc<Mutex<RestApiStatus>>,
    shutdown_tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
    task_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl RestApiServer {
    /// Create a new server handle
    pub fn new(state: ApiState) -> Self {
        Self {
            state,
            status: Arc::new(Mutex::new(RestApiStatus::Stopped)),
            shutdown_tx: Arc::new(Mutex::new(None)),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Get current server status
    pub fn status(&self) -> RestApiStatus {
        self.status.lock().unwrap().clone()
    }

    /// Check if server is running
    pub fn is_running(&self) -> bool {
        self.status().is_running()
    }

    /// Start the server on `port`. Port 0 binds an ephemeral port;
    /// the actual port is returned and reflected in `status()`.
    pub async fn start(&self, port: u16) -> Result<u16> {
        if self.is_running() {
            bail!("REST API already running");
        }

        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        let bound_port = listener.local_addr()?.port();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        *self.shutdown_tx.lock().unwrap() = Some(shutdown_tx);

        let router = build_router(self.state.clone());
        let status = self.status.clone();
        *status.lock().unwrap() = RestApiStatus::Running { port: bound_port };
        tracing::info!("REST API listening on http://0.0.0.0:{}", bound_port);

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            *status.lock().unwrap() = RestApiStatus::Stopped;
        });
        *self.task_handle.lock().unwrap() = Some(handle);

        Ok(bound_port)
    }

    /// Stop the REST API server
    pub async fn stop(&self) {
        *self.status.lock().unwrap() = RestApiStatus::Stopping;

        if let Some(tx) = self.shutdown_tx.lock().unwrap().take() {
            let _ = tx.send(());
        }
        let handle = self.task_handle.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        *self.status.lock().unwrap() = RestApiStatus::Stopped;
        tracing::info!("REST API server stopped");
    }
}

impl Drop for RestApiServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.lock().unwrap().take() {
            let _ = tx.send(());
        }
    }
}
