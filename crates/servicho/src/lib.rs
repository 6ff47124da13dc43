//! servicho - a live-reloading development server.
//!
//! Serves a directory over HTTP, renders throwaway preview pages for
//! `.js`/`.jsx` component modules, and tells every open browser tab to reload
//! when a file under the directory changes.
//!
//! # Architecture
//!
//! - [`ports`] - picks the HTTP and push channel ports from a fixed pool
//! - [`watcher`] - recursive file watcher producing [`watcher::ChangeEvent`]s
//! - [`hub`] - WebSocket push channel broadcasting `"refresh"`
//! - [`resolver`] - maps request paths to files under the root
//! - [`preview`] - builds component preview pages
//! - [`router`] - the HTTP entry point
//! - [`reload_stub`] - the injected browser client and its reconnect policy
//! - [`session`] - owns all of the above for one run
//!
//! # Example
//!
//! ```rust,no_run
//! use servicho::config::ServerConfig;
//! use servicho::session::ServerSession;
//! use std::path::Path;
//!
//! # async fn run() -> servicho::Result<()> {
//! let session = ServerSession::start(Path::new("./site"), ServerConfig::default())?;
//! println!("open {}", session.http_url());
//! session.run().await
//! # }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod hub;
pub mod logger;
pub mod ports;
pub mod preview;
pub mod reload_stub;
pub mod resolver;
pub mod router;
pub mod session;
pub mod ui;
pub mod watcher;

pub use error::{ConfigError, Result, ServeError};
