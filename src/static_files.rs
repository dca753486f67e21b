//! Serving files from a directory.
//!
//! Requested paths are resolved segment by segment under the root. Any `..`
//! segment is rejected outright rather than normalised, so nothing outside
//! the root can be reached. Directories resolve to their `index.html`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::StaticError;
use crate::middleware::{handler, Handler};
use crate::types::STATUS_OK;

/// Name of the route parameter the static route captures into.
pub const FILEPATH_PARAM: &str = "filepath";

/// A directory of assets.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a `/`-separated relative path to a file under the root.
    ///
    /// # Errors
    ///
    /// [`StaticError::TraversalRejected`] for any `..` segment,
    /// [`StaticError::NotFound`] if nothing exists at the resolved path.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, StaticError> {
        let mut path = self.root.clone();
        for segment in relative.split(['/', '\\']) {
            match segment {
                ".." => return Err(StaticError::TraversalRejected(relative.to_string())),
                "" | "." => {}
                s => path.push(s),
            }
        }

        if path.is_dir() {
            path.push("index.html");
        }
        if path.is_file() {
            Ok(path)
        } else {
            Err(StaticError::NotFound(relative.to_string()))
        }
    }

    /// Resolve and read an asset.
    pub fn open(&self, relative: &str) -> Result<(PathBuf, Vec<u8>), StaticError> {
        let path = self.resolve(relative)?;
        let bytes = fs::read(&path).map_err(|_| StaticError::NotFound(relative.to_string()))?;
        Ok((path, bytes))
    }

    /// Route handler serving the asset named by the `filepath` parameter.
    /// Every failure is answered with the fixed 404 page.
    pub fn into_handler(self) -> Handler {
        let files = Arc::new(self);
        handler(move |ctx| {
            let relative = ctx.param(FILEPATH_PARAM).unwrap_or_default().to_string();
            match files.open(&relative) {
                Ok((path, bytes)) => {
                    ctx.response_mut()
                        .send(STATUS_OK, Some(content_type_for(&path)), &bytes)?;
                }
                Err(err) => {
                    if matches!(err, StaticError::TraversalRejected(_)) {
                        tracing::warn!(path = %relative, "rejected static path traversal");
                    } else {
                        tracing::debug!(error = %err, "static asset missing");
                    }
                    ctx.not_found()?;
                }
            }
            Ok(())
        })
    }
}

/// Guess a `Content-Type` from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "wasm" => "application/wasm",
        "pdf" => "application/pdf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tapster-static-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("docs")).unwrap();
        fs::write(dir.join("index.html"), "<h1>home</h1>").unwrap();
        fs::write(dir.join("docs/index.html"), "<h1>docs</h1>").unwrap();
        fs::write(dir.join("docs/guide.txt"), "read me").unwrap();
        dir
    }

    #[test]
    fn resolves_files_and_directory_indexes() {
        let root = fixture("resolve");
        let files = StaticFiles::new(&root);
        assert_eq!(files.resolve("docs/guide.txt").unwrap(), root.join("docs/guide.txt"));
        assert_eq!(files.resolve("docs").unwrap(), root.join("docs/index.html"));
        assert_eq!(files.resolve("").unwrap(), root.join("index.html"));
    }

    #[test]
    fn rejects_parent_segments() {
        let root = fixture("traversal");
        let files = StaticFiles::new(root.join("docs"));
        assert!(matches!(
            files.resolve("../index.html"),
            Err(StaticError::TraversalRejected(_))
        ));
        assert!(matches!(
            files.resolve("a/../../index.html"),
            Err(StaticError::TraversalRejected(_))
        ));
        assert!(matches!(
            files.resolve("..\\index.html"),
            Err(StaticError::TraversalRejected(_))
        ));
    }

    #[test]
    fn missing_asset_is_not_found() {
        let root = fixture("missing");
        let files = StaticFiles::new(&root);
        assert!(matches!(files.resolve("nope.css"), Err(StaticError::NotFound(_))));
    }

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type_for(Path::new("a/b.CSS")), "text/css; charset=utf-8");
        assert_eq!(content_type_for(Path::new("x.png")), "image/png");
        assert_eq!(content_type_for(Path::new("noext")), "application/octet-stream");
    }
}
