//! Request-scoped temp files
//!
//! Names are `<uuid>_<sanitized filename>` so concurrent requests that submit
//! the same filename never share a path. The file is removed when its
//! [`TempFile`] guard is dropped, whichever way the request ends.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::secure_filename;

/// Directory that holds in-flight request images
#[derive(Debug, Clone)]
pub struct TempStorage {
    dir: PathBuf,
}

impl TempStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the storage directory if it does not exist yet
    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Reserve a unique path for `filename`
    ///
    /// Nothing is written until [`TempFile::write`] is called.
    pub fn reserve(&self, filename: &str) -> TempFile {
        let name = format!(
            "{}_{}",
            Uuid::new_v4().simple(),
            fit_name(&secure_filename(filename))
        );
        TempFile {
            path: self.dir.join(name),
        }
    }
}

/// Longest file name most filesystems accept (NAME_MAX)
const MAX_NAME_BYTES: usize = 255;

/// Room left for the sanitized name after `<32 hex uuid>_`
const MAX_SUFFIX_BYTES: usize = MAX_NAME_BYTES - 33;

/// Shorten a sanitized (ASCII) name to fit after the uuid prefix, keeping
/// its extension
fn fit_name(name: &str) -> String {
    if name.len() <= MAX_SUFFIX_BYTES {
        return name.to_string();
    }

    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() + 2 <= MAX_SUFFIX_BYTES => {
            let keep = MAX_SUFFIX_BYTES - ext.len() - 1;
            format!("{}.{}", &stem[..keep.min(stem.len())], ext)
        }
        _ => name[..MAX_SUFFIX_BYTES].to_string(),
    }
}

/// Guard over one temp file, deleted on drop
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
}

impl TempFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn write(&self, data: &[u8]) -> std::io::Result<()> {
        tokio::fs::write(&self.path, data).await
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::trace!(path = %self.path.display(), "Removed temp file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                "Failed to remove temp file: {}",
                e
            ),
        }
    }
}
