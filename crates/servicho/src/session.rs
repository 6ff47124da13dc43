//! One running development server.
//!
//! A [`ServerSession`] owns everything a run needs: the served root, the two
//! allocated ports, the push hub and the change watcher. It is built once at
//! startup and consumed by [`ServerSession::run`].

use crate::config::ServerConfig;
use crate::error::{Result, ServeError};
use crate::hub::PushHub;
use crate::ports::{self, SESSION_PORT_COUNT};
use crate::reload_stub::ReloadStub;
use crate::resolver::{AssetFs, NativeFs};
use crate::router::{build_router, AppState, SharedState};
use crate::ui;
use crate::watcher::{ChangeEvent, ChangeWatcher};
use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Ports allocated and watcher running, listeners not bound yet
    Starting,
    Listening,
    Stopped,
}

pub struct ServerSession {
    root: PathBuf,
    config: ServerConfig,
    http_port: u16,
    push_port: u16,
    state: SessionState,
    hub: Arc<PushHub>,
    watcher: ChangeWatcher,
    changes: Option<mpsc::Receiver<ChangeEvent>>,
    fs: Arc<dyn AssetFs>,
}

impl ServerSession {
    /// Prepare a session for `root`.
    ///
    /// Canonicalizes the root, allocates the HTTP and push ports from the
    /// configured pool and starts watching.
    ///
    /// # Errors
    ///
    /// - [`ServeError::InvalidRoot`] if `root` is not a directory
    /// - [`ServeError::NoAvailablePort`] if the pool is exhausted
    /// - [`ServeError::WatcherSetup`] if the root cannot be watched
    pub fn start(root: &Path, config: ServerConfig) -> Result<Self> {
        let root = root
            .canonicalize()
            .map_err(|_| ServeError::InvalidRoot(root.to_path_buf()))?;
        if !root.is_dir() {
            return Err(ServeError::InvalidRoot(root));
        }

        let allocated = ports::allocate(config.host, &config.ports, SESSION_PORT_COUNT)?;
        let (http_port, push_port) = (allocated[0], allocated[1]);

        let (watcher, changes) = ChangeWatcher::new(root.clone(), config.watch_options())?;

        Ok(Self {
            root,
            config,
            http_port,
            push_port,
            state: SessionState::Starting,
            hub: Arc::new(PushHub::new()),
            watcher,
            changes: Some(changes),
            fs: Arc::new(NativeFs),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    pub fn push_port(&self) -> u16 {
        self.push_port
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn hub(&self) -> Arc<PushHub> {
        Arc::clone(&self.hub)
    }

    pub fn http_url(&self) -> String {
        format!("http://{}", SocketAddr::new(self.config.host, self.http_port))
    }

    pub fn push_url(&self) -> String {
        format!("ws://{}", SocketAddr::new(self.config.host, self.push_port))
    }

    /// Router state for this session.
    pub fn app_state(&self) -> SharedState {
        let stub = ReloadStub::new(self.push_port, self.config.reconnect_policy());
        Arc::new(AppState {
            root: self.root.clone(),
            fs: Arc::clone(&self.fs),
            reload_script: stub.script_tag(),
        })
    }

    /// Serve until Ctrl+C.
    pub async fn run(self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Serve until `shutdown` resolves or a listener fails.
    ///
    /// # Errors
    ///
    /// Returns [`ServeError::Bind`] if a listener cannot bind, or
    /// [`ServeError::Server`] if one stops unexpectedly.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let http_listener = bind(SocketAddr::new(self.config.host, self.http_port)).await?;
        let push_listener = bind(SocketAddr::new(self.config.host, self.push_port)).await?;
        self.state = SessionState::Listening;
        tracing::debug!(
            state = ?self.state,
            http_port = self.http_port,
            push_port = self.push_port,
            "session state changed"
        );

        ui::success(&format!("Server is listening on {}", self.http_url()));
        ui::success(&format!("Push channel is listening on {}", self.push_url()));
        ui::info(&format!("Watching directory: {}", self.watcher.root().display()));
        ui::info("Press Ctrl+C to stop the server");

        let mut push_task = tokio::spawn(Arc::clone(&self.hub).serve(push_listener));

        let hub = Arc::clone(&self.hub);
        let changes = self.changes.take();
        let forward_task = tokio::spawn(async move {
            if let Some(changes) = changes {
                hub.forward_changes(changes).await;
            }
        });

        let app = build_router(self.app_state());
        let http = async move {
            axum::serve(http_listener, app)
                .with_graceful_shutdown(shutdown)
                .await
        };

        let outcome = tokio::select! {
            result = http => {
                result.map_err(|e| ServeError::Server(format!("HTTP server error: {}", e)))
            }
            joined = &mut push_task => match joined {
                Ok(Ok(())) => Err(ServeError::Server("Push channel stopped".to_string())),
                Ok(Err(e)) => Err(e),
                Err(e) => Err(ServeError::Server(format!("Push channel task failed: {}", e))),
            },
        };

        push_task.abort();
        forward_task.abort();
        self.state = SessionState::Stopped;
        tracing::debug!(state = ?self.state, "session state changed");

        if outcome.is_ok() {
            ui::success("Development server stopped");
        }
        outcome
    }
}

async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServeError::Bind { addr, source })
}
