use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::runtime::Handle;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("failed to create session directory {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Allocates one isolated directory per request under a fixed root
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates a fresh session directory `<root>/<uuid>`.
    ///
    /// The leaf is created with `create_dir`, not `create_dir_all`, so an
    /// existing directory is an error and a session never adopts another
    /// request's files.
    pub async fn create(&self) -> Result<Session, WorkspaceError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| WorkspaceError::Create {
                path: self.root.clone(),
                source,
            })?;

        let id = Uuid::new_v4();
        let dir = self.root.join(id.to_string());
        tokio::fs::create_dir(&dir)
            .await
            .map_err(|source| WorkspaceError::Create {
                path: dir.clone(),
                source,
            })?;

        tracing::debug!("Created session {} at {}", id, dir.display());

        Ok(Session {
            id,
            archive: self.root.join(format!("cleaned_files_{}.zip", id)),
            dir,
            released: false,
        })
    }
}

/// Temporary storage owned by a single request.
///
/// Dropping the session removes its directory and its archive (if one was
/// built), on the blocking pool when a runtime is available. `destroy` does
/// the same and waits for it; either way the removal runs once.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    dir: PathBuf,
    archive: PathBuf,
    released: bool,
}

impl Session {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where a multi-file result is written: beside the directory, not inside it
    pub fn archive_path(&self) -> &Path {
        &self.archive
    }

    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    pub async fn destroy(mut self) {
        self.released = true;
        let dir = self.dir.clone();
        let archive = self.archive.clone();
        let id = self.id;

        if let Err(e) =
            tokio::task::spawn_blocking(move || remove_artifacts(id, &dir, &archive)).await
        {
            tracing::error!("Cleanup task for session {} failed: {}", id, e);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let id = self.id;
        let dir = std::mem::take(&mut self.dir);
        let archive = std::mem::take(&mut self.archive);

        // Inside the runtime the removal goes to the blocking pool so a
        // finished response body never stalls a worker thread
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || remove_artifacts(id, &dir, &archive));
            }
            Err(_) => remove_artifacts(id, &dir, &archive),
        }
    }
}

/// Best-effort removal; failures are logged, never propagated
fn remove_artifacts(id: Uuid, dir: &Path, archive: &Path) {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => tracing::debug!("Removed session {}", id),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::error!("Error removing temporary files for session {}: {}", id, e),
    }

    match std::fs::remove_file(archive) {
        Ok(()) => tracing::debug!("Removed archive {}", archive.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::error!("Error removing archive for session {}: {}", id, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_create_and_destroy() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());

        let session = manager.create().await.unwrap();
        let dir = session.dir().to_path_buf();
        assert!(dir.is_dir());
        assert!(dir.starts_with(root.path()));
        assert_eq!(session.archive_path().parent(), Some(root.path()));

        std::fs::write(session.file_path("a.jpg"), b"data").unwrap();
        std::fs::write(session.archive_path(), b"zip").unwrap();
        let archive = session.archive_path().to_path_buf();

        session.destroy().await;
        assert!(!dir.exists());
        assert!(!archive.exists());
    }

    async fn wait_until_gone(path: &Path) -> bool {
        for _ in 0..200 {
            if !path.exists() {
                return true;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_drop_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());

        let (dir, archive) = {
            let session = manager.create().await.unwrap();
            std::fs::write(session.file_path("b.png"), b"data").unwrap();
            std::fs::write(session.archive_path(), b"zip").unwrap();
            (session.dir().to_path_buf(), session.archive_path().to_path_buf())
        };
        assert!(wait_until_gone(&dir).await, "session directory survived drop");
        assert!(wait_until_gone(&archive).await, "archive survived drop");
    }

    #[test]
    fn test_drop_outside_runtime_removes_synchronously() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());
        let runtime = tokio::runtime::Runtime::new().unwrap();

        let session = runtime.block_on(manager.create()).unwrap();
        let dir = session.dir().to_path_buf();
        drop(session);
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_destroy_tolerates_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());

        let session = manager.create().await.unwrap();
        std::fs::remove_dir_all(session.dir()).unwrap();
        session.destroy().await;
    }

    #[tokio::test]
    async fn test_creates_missing_root() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path().join("nested").join("uploads"));

        let session = manager.create().await.unwrap();
        assert!(session.dir().is_dir());
    }

    #[tokio::test]
    async fn test_session_ids_are_unique() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());

        let mut sessions = Vec::new();
        for _ in 0..32 {
            sessions.push(manager.create().await.unwrap());
        }
        let ids: HashSet<_> = sessions.iter().map(Session::id).collect();
        assert_eq!(ids.len(), sessions.len());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_create_fails_on_unwritable_root() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();

        let manager = WorkspaceManager::new(&blocker);
        assert!(matches!(
            manager.create().await,
            Err(WorkspaceError::Create { .. })
        ));
    }
}
