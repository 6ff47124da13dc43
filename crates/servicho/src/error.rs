//! Error types for the development server.
//!
//! Failures are split the same way the server treats them at runtime:
//!
//! - **Fatal startup errors** (`NoAvailablePort`, `WatcherSetup`, `Bind`,
//!   `InvalidRoot`, `Config`) abort the process with exit code 1.
//! - **Per-request errors** (`AssetRead`) become a 500 response; the server
//!   keeps running.
//!
//! A missing asset is not an error at all; see
//! [`ResolvedAsset::NotFound`](crate::resolver::ResolvedAsset::NotFound).

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for servicho.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The candidate port pool ran out before enough free ports were found.
    #[error("No available port: needed {needed} free port(s) in pool {pool:?}")]
    NoAvailablePort {
        /// How many ports were requested
        needed: usize,
        /// The pool that was probed, in probe order
        pool: Vec<u16>,
    },

    /// The change watcher could not be started on the root directory.
    #[error("Failed to watch {}: {source}", .path.display())]
    WatcherSetup {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// A file under the root exists but could not be inspected or read.
    #[error("Failed to read {}: {source}", .path.display())]
    AssetRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A listener could not bind its socket.
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The directory to serve is missing or is not a directory.
    #[error("Root directory not found: {}", .0.display())]
    InvalidRoot(PathBuf),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Listener failures after startup
    #[error("Server error: {0}")]
    Server(String),

    /// I/O errors outside asset reads
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config source could not be parsed or has the wrong shape
    #[error("Failed to load configuration: {0}\n\nHint: Check servicho.config.json syntax and SERVICHO_* environment variables")]
    Load(String),

    /// A field has an unusable value
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        field: String,
        value: String,
        hint: String,
    },
}

/// Result type alias for servicho operations.
pub type Result<T, E = ServeError> = std::result::Result<T, E>;

/// Convert a fatal error into a miette report for the final exit message.
pub fn into_report(err: ServeError) -> miette::Report {
    match err {
        ServeError::NoAvailablePort { needed, pool } => miette::miette!(
            "No available port: needed {} free port(s) in pool {:?}\n\nHint: Stop other servicho instances or set a different pool with SERVICHO_PORTS",
            needed,
            pool
        ),
        ServeError::InvalidRoot(path) => miette::miette!(
            "Root directory not found: {}\n\nHint: Pass an existing directory, e.g. `servicho ./site`",
            path.display()
        ),
        other => miette::miette!("{}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_available_port_message_names_pool() {
        let err = ServeError::NoAvailablePort {
            needed: 2,
            pool: vec![13001, 13002],
        };
        let msg = err.to_string();
        assert!(msg.contains("No available port"));
        assert!(msg.contains("13001"));
        assert!(msg.contains("13002"));
    }

    #[test]
    fn test_config_error_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "ports".to_string(),
            value: "[]".to_string(),
            hint: "List at least two ports".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Invalid value for 'ports'"));
        assert!(msg.contains("Hint: List at least two ports"));
    }

    #[test]
    fn test_serve_error_from_config_error() {
        let err: ServeError = ConfigError::Load("bad json".to_string()).into();
        assert!(matches!(err, ServeError::Config(_)));
    }

    #[test]
    fn test_report_includes_hint_for_root() {
        let report = into_report(ServeError::InvalidRoot(PathBuf::from("/missing")));
        let msg = format!("{}", report);
        assert!(msg.contains("/missing"));
        assert!(msg.contains("Hint:"));
    }
}
