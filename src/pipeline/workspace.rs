// Per-request temp directory with exactly-once cleanup
//
// The directory is removed when the workspace is dropped, so every early
// return cleans up immediately. A successful request instead hands the
// workspace to `schedule_cleanup`, which moves it onto a timer thread. Both
// paths consume the value, so cleanup can only ever be arranged once.

use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::Duration;

use tempfile::TempDir;
use tracing::{debug, warn};
use uuid::Uuid;

const UPLOADS_DIR: &str = "uploads";

pub struct RequestWorkspace {
    request_id: Uuid,
    dir: TempDir,
}

impl RequestWorkspace {
    /// Create `snapmerge-<request id>-XXXX` under `root` (OS temp dir if `None`).
    pub fn create(root: Option<&Path>, request_id: Uuid) -> crate::error::Result<Self> {
        let root = root.map_or_else(std::env::temp_dir, Path::to_path_buf);
        std::fs::create_dir_all(&root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("snapmerge-{request_id}-"))
            .tempdir_in(&root)?;
        std::fs::create_dir(dir.path().join(UPLOADS_DIR))?;
        debug!(%request_id, path = %dir.path().display(), "workspace created");
        Ok(Self { request_id, dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path for an artifact at the workspace root.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write an upload under its ordered name.
    pub fn persist_upload(&self, ordered_name: &str, bytes: &[u8]) -> crate::error::Result<PathBuf> {
        let path = self.dir.path().join(UPLOADS_DIR).join(ordered_name);
        std::fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Remove the directory now.
    pub fn discard(self) {
        let request_id = self.request_id;
        if let Err(e) = self.dir.close() {
            warn!(%request_id, error = %e, "failed to remove workspace");
        } else {
            debug!(%request_id, "workspace removed");
        }
    }

    /// Remove the directory after `grace` on a background thread.
    ///
    /// The returned handle can be waited on; dropping it does not cancel the
    /// cleanup.
    pub fn schedule_cleanup(self, grace: Duration) -> CleanupHandle {
        let path = self.dir.path().to_path_buf();
        let request_id = self.request_id;
        debug!(%request_id, ?grace, "cleanup scheduled");

        // On spawn failure the closure, and the workspace inside it, is
        // dropped right away, which removes the directory.
        let spawned = std::thread::Builder::new()
            .name(format!("snapmerge-cleanup-{request_id}"))
            .spawn(move || {
                if !grace.is_zero() {
                    std::thread::sleep(grace);
                }
                self.discard();
            });

        let handle = match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(%request_id, error = %e, "cannot spawn cleanup thread, removed immediately");
                None
            }
        };

        CleanupHandle { path, handle }
    }
}

/// Handle to a scheduled cleanup.
pub struct CleanupHandle {
    path: PathBuf,
    handle: Option<JoinHandle<()>>,
}

impl CleanupHandle {
    /// Directory that will be removed.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Block until the cleanup has run.
    pub fn wait(self) {
        if let Some(handle) = self.handle
            && handle.join().is_err()
        {
            warn!(path = %self.path.display(), "cleanup thread panicked");
        }
    }
}
