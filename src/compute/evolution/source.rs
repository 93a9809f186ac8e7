//! Target sources for runs whose reference image changes over time.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::compute::{Canvas, TargetError};

/// Supplier of replacement target frames, polled between generations.
pub trait TargetSource: Send {
    /// A new frame if one is available since the last poll.
    fn poll(&mut self) -> Result<Option<Canvas>, TargetError>;
}

/// Re-reads an image file whenever its modification time changes.
pub struct ReloadingFileSource {
    path: PathBuf,
    last_modified: Option<SystemTime>,
}

impl ReloadingFileSource {
    /// Watch `path`. The file's current state counts as already seen.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let last_modified = std::fs::metadata(&path).and_then(|m| m.modified()).ok();
        Self {
            path,
            last_modified,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TargetSource for ReloadingFileSource {
    fn poll(&mut self) -> Result<Option<Canvas>, TargetError> {
        let modified = std::fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .map_err(|source| TargetError::Metadata {
                path: self.path.clone(),
                source,
            })?;

        if self.last_modified == Some(modified) {
            return Ok(None);
        }
        let canvas = Canvas::open(&self.path)?;
        self.last_modified = Some(modified);
        Ok(Some(canvas))
    }
}
