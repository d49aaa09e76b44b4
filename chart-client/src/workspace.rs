use std::{
    fmt::Debug,
    path::{Path, PathBuf},
};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::ChartError;

/// A uniquely named temporary directory owned by a single request.
///
/// The directory is removed by [`ScratchWorkspace::close`]. If the owner is
/// dropped without closing it (panic, cancelled task), removal still happens
/// on drop, only silently.
pub struct ScratchWorkspace {
    dir: TempDir,
}

impl Debug for ScratchWorkspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScratchWorkspace")
            .field("path", &self.dir.path())
            .finish()
    }
}

impl ScratchWorkspace {
    pub fn create(root: Option<&Path>, prefix: &str) -> Result<Self, ChartError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix);
        let dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(ChartError::storage("failed to create temp directory"))?;
        debug!(path = %dir.path().display(), "Created scratch workspace");
        Ok(ScratchWorkspace { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join<P: AsRef<Path>>(&self, name: P) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Remove the directory and everything below it.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!(path = %path.display(), "Removed scratch workspace"),
            Err(err) => warn!(path = %path.display(), %err, "Unable to remove scratch workspace"),
        }
    }
}
