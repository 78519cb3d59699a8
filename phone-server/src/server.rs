//! HTTP listener lifecycle for the local expense API

use crate::net::advertised_address;
use crate::routes::router;
use crate::store::{ExpenseStore, StubExpenseStore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Whether the host should start the server at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Interface to bind (all interfaces by default)
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind; 0 lets the OS choose
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Server task failed: {0}")]
    Crashed(String),
}

/// Where a freshly started server can be reached
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub status: &'static str,
    pub ip_address: String,
    pub port: u16,
    pub url: String,
}

impl ServerInfo {
    fn new(ip: IpAddr, port: u16) -> Self {
        Self {
            status: "started",
            ip_address: ip.to_string(),
            port,
            url: format!("http://{}", SocketAddr::new(ip, port)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started(ServerInfo),
    AlreadyRunning,
}

impl fmt::Display for StartOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartOutcome::Started(info) => write!(f, "Server started at {}", info.url),
            StartOutcome::AlreadyRunning => write!(f, "Server already running"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    NotRunning,
}

impl fmt::Display for StopOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopOutcome::Stopped => write!(f, "Server stopped"),
            StopOutcome::NotRunning => write!(f, "Server not running"),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    pub is_running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// A bound listener and the task serving it
struct RunningServer {
    port: u16,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl RunningServer {
    fn is_alive(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    async fn shutdown(mut self) -> Result<(), ServerError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                if err.is_panic() {
                    return Err(ServerError::Crashed(err.to_string()));
                }
            }
        }

        Ok(())
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                handle.abort();
            }
        }
    }
}

/// Local expense API server.
///
/// Owns at most one listener at a time. Dropping the server closes it.
pub struct PhoneServer {
    host: String,
    store: Arc<dyn ExpenseStore>,
    running: Mutex<Option<RunningServer>>,
}

impl PhoneServer {
    /// Create a server that will bind `config.host` and serve `store`
    pub fn new(config: &ServerConfig, store: Arc<dyn ExpenseStore>) -> Self {
        Self {
            host: config.host.clone(),
            store,
            running: Mutex::new(None),
        }
    }

    /// Create a server on all interfaces backed by the stub store
    pub fn with_defaults() -> Self {
        Self::new(&ServerConfig::default(), Arc::new(StubExpenseStore))
    }

    /// Bind `port` and start serving.
    ///
    /// A live server is left untouched and reported as already running.
    pub async fn start(&self, port: u16) -> Result<StartOutcome, ServerError> {
        let mut running = self.running.lock().await;

        if let Some(server) = running.as_ref() {
            if server.is_alive() {
                info!("Phone server already running on port {}", server.port);
                return Ok(StartOutcome::AlreadyRunning);
            }
            warn!("Previous phone server on port {} has exited", server.port);
        }
        *running = None;

        let addr = format!("{}:{}", self.host, port);
        let listener = TcpListener::bind((self.host.as_str(), port))
            .await
            .map_err(|source| {
                error!("Error starting phone server on {}: {}", addr, source);
                ServerError::Bind {
                    addr: addr.clone(),
                    source,
                }
            })?;
        let port = listener.local_addr()?.port();

        let app = router(Arc::clone(&self.store));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                error!("Phone server error: {}", err);
            }
        });

        *running = Some(RunningServer {
            port,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        });

        let info = ServerInfo::new(advertised_address(&self.host), port);
        info!("Phone server started at {}", info.url);
        Ok(StartOutcome::Started(info))
    }

    /// Stop serving and release the port
    pub async fn stop(&self) -> Result<StopOutcome, ServerError> {
        let mut running = self.running.lock().await;

        match running.take() {
            Some(server) if server.is_alive() => {
                let port = server.port;
                server.shutdown().await?;
                info!("Phone server on port {} stopped", port);
                Ok(StopOutcome::Stopped)
            }
            _ => {
                info!("Phone server not running");
                Ok(StopOutcome::NotRunning)
            }
        }
    }

    pub async fn status(&self) -> ServerStatus {
        let running = self.running.lock().await;

        match running.as_ref() {
            Some(server) if server.is_alive() => ServerStatus {
                is_running: true,
                ip_address: Some(advertised_address(&self.host).to_string()),
                port: Some(server.port),
            },
            _ => ServerStatus {
                is_running: false,
                ip_address: None,
                port: None,
            },
        }
    }
}
