//! Static asset resolution under the served root.
//!
//! Maps a request path onto a file below the root directory. Directories
//! fall back to their `index.html`, at most once per request. A missing file
//! is a normal outcome ([`ResolvedAsset::NotFound`]); only real I/O failures
//! are errors.
//!
//! File access goes through the [`AssetFs`] trait so the router can be
//! exercised against a failing filesystem in tests.

use crate::error::{Result, ServeError};
use async_trait::async_trait;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Document served for a directory request.
pub const INDEX_DOCUMENT: &str = "index.html";

/// Directory-to-index redirects allowed per request.
const MAX_INDEX_REDIRECTS: usize = 1;

/// What a resolved file should be served as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// `.html` document; gets the reload stub injected
    Html,
    /// Anything else; served as raw bytes
    Other,
}

/// Outcome of resolving a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedAsset {
    Found {
        /// File on disk that was read
        path: PathBuf,
        content: Vec<u8>,
        kind: ContentKind,
    },
    NotFound,
}

/// Type of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// Sockets, FIFOs and other things that are never served
    Other,
}

/// Filesystem capability consumed by the resolver.
#[async_trait]
pub trait AssetFs: Send + Sync + std::fmt::Debug {
    /// Stat `path`. `Ok(None)` means it does not exist.
    async fn entry_kind(&self, path: &Path) -> io::Result<Option<EntryKind>>;

    /// Read the full contents of a file.
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// [`AssetFs`] backed by `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeFs;

#[async_trait]
impl AssetFs for NativeFs {
    async fn entry_kind(&self, path: &Path) -> io::Result<Option<EntryKind>> {
        match tokio::fs::metadata(path).await {
            Ok(metadata) if metadata.is_dir() => Ok(Some(EntryKind::Directory)),
            Ok(metadata) if metadata.is_file() => Ok(Some(EntryKind::File)),
            Ok(_) => Ok(Some(EntryKind::Other)),
            Err(e) if is_absent(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }
}

/// `/index.html/x` fails with NotADirectory; that is absence, not failure.
fn is_absent(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

/// Turn a URL path into a relative filesystem path below the root.
///
/// Empty and `.` segments are dropped and `..` pops the previous segment.
/// Returns `None` when a `..` would climb above the root or a segment could
/// smuggle in another path (`\`, NUL, a drive prefix).
pub fn normalize_request_path(request_path: &str) -> Option<PathBuf> {
    let mut segments: Vec<&str> = Vec::new();

    for segment in request_path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            s if s.contains(&['\\', '\0'][..]) || !is_plain_segment(s) => return None,
            s => segments.push(s),
        }
    }

    Some(segments.iter().collect())
}

/// A segment must stay a single normal component on this platform.
fn is_plain_segment(segment: &str) -> bool {
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Resolve `request_path` against `root`.
///
/// # Errors
///
/// Returns [`ServeError::AssetRead`] when a path exists but cannot be
/// inspected or read.
pub async fn resolve(fs: &dyn AssetFs, request_path: &str, root: &Path) -> Result<ResolvedAsset> {
    let Some(relative) = normalize_request_path(request_path) else {
        tracing::debug!(request_path, "rejected path outside root");
        return Ok(ResolvedAsset::NotFound);
    };

    let mut candidate = root.join(relative);

    for _ in 0..=MAX_INDEX_REDIRECTS {
        let entry = fs
            .entry_kind(&candidate)
            .await
            .map_err(|source| ServeError::AssetRead {
                path: candidate.clone(),
                source,
            })?;

        match entry {
            None | Some(EntryKind::Other) => return Ok(ResolvedAsset::NotFound),
            Some(EntryKind::Directory) => candidate.push(INDEX_DOCUMENT),
            Some(EntryKind::File) => {
                let content = match fs.read(&candidate).await {
                    Ok(content) => content,
                    // Deleted between stat and read.
                    Err(e) if is_absent(&e) => return Ok(ResolvedAsset::NotFound),
                    Err(source) => {
                        return Err(ServeError::AssetRead {
                            path: candidate,
                            source,
                        })
                    }
                };
                let kind = content_kind(&candidate);
                return Ok(ResolvedAsset::Found {
                    path: candidate,
                    content,
                    kind,
                });
            }
        }
    }

    Ok(ResolvedAsset::NotFound)
}

fn content_kind(path: &Path) -> ContentKind {
    let is_html = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(".html"));

    if is_html {
        ContentKind::Html
    } else {
        ContentKind::Other
    }
}
