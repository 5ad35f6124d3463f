//! Filesystem-backed static file metadata.

use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::content::{CollaboratorError, FileStore};

/// Resolves URL paths against a web root directory.
#[derive(Debug, Clone)]
pub struct WebRootFiles {
    root: PathBuf,
}

impl WebRootFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a URL path onto the web root. Returns None for paths that would
    /// escape it.
    fn resolve(&self, url_path: &str) -> Option<PathBuf> {
        let path_only = url_path.split(['?', '#']).next().unwrap_or_default();
        let decoded = percent_decode_str(path_only).decode_utf8().ok()?;

        let mut resolved = self.root.clone();
        for component in Path::new(decoded.trim_start_matches('/')).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(resolved)
    }
}

impl FileStore for WebRootFiles {
    fn exists(&self, path: &str) -> bool {
        self.resolve(path).map(|p| p.is_file()).unwrap_or(false)
    }

    fn last_write_time(&self, path: &str) -> Result<DateTime<Utc>, CollaboratorError> {
        let resolved = self.resolve(path).ok_or_else(|| {
            CollaboratorError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("path escapes web root: {}", path),
            ))
        })?;
        let modified = fs::metadata(resolved)?.modified()?;
        Ok(DateTime::<Utc>::from(modified))
    }
}
