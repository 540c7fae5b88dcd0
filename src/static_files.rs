//! Static file serving.
//!
//! Resolves URL paths against a root directory, refusing anything that
//! would escape it, and detects content types from file extensions.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Serves files from a single root directory.
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a URL path onto the filesystem. Parent-directory and absolute
    /// components are rejected.
    fn map_path(&self, url_path: &str) -> Option<PathBuf> {
        let mut resolved = self.root.clone();
        for component in Path::new(url_path.trim_start_matches('/')).components() {
            match component {
                Component::Normal(segment) => resolved.push(segment),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(resolved)
    }

    /// Read the file behind `url_path`, returning its bytes and the content
    /// type detected from its extension.
    pub async fn load(&self, url_path: &str) -> io::Result<(Vec<u8>, &'static str)> {
        let path = self
            .map_path(url_path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "path escapes static root"))?;
        let bytes = tokio::fs::read(&path).await?;
        Ok((bytes, content_type(&path)))
    }
}

/// Content type from the file extension; octet-stream when unknown.
pub fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("xml") => "application/xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}
