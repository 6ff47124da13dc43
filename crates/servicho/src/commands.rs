//! The `servicho` command.

use crate::cli::Cli;
use crate::config::ServerConfig;
use crate::error::{Result, ServeError};
use crate::session::ServerSession;
use crate::ui;

/// Execute the server command.
///
/// # Process Flow
///
/// 1. Resolve the root directory and load configuration
/// 2. Allocate ports and start the change watcher
/// 3. Serve HTTP and the push channel until Ctrl+C
///
/// # Errors
///
/// Returns the fatal startup and listener errors; everything else is
/// handled while serving.
pub async fn execute(args: Cli) -> Result<()> {
    let root = args.root_dir()?;
    if !root.is_dir() {
        return Err(ServeError::InvalidRoot(root));
    }

    let config = ServerConfig::load(&root, &args.config_overrides())?;
    tracing::debug!(?config, "configuration loaded");

    let session = ServerSession::start(&root, config)?;
    ui::info(&format!(
        "Using ports {} (HTTP) and {} (push channel)",
        session.http_port(),
        session.push_port()
    ));

    session.run().await
}
