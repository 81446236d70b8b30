//! File-backed build-state store
//!
//! Layout under the state directory:
//!
//! ```text
//! images/
//!   <project>.state   JSON record
//!   <project>.lock    advisory lock, held while a build decision is made
//! ```

use crate::cleanup::CleanupResult;
use crate::error::{TierboxError, TierboxResult};
use crate::state::{BuildStateRecord, BuildStateStore};
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Guard for a per-project build lock
#[derive(Debug)]
pub struct StateLock {
    _file: Option<File>,
}

impl StateLock {
    /// A guard that holds nothing, for stores without cross-process state
    pub fn unlocked() -> Self {
        Self { _file: None }
    }
}

/// Build-state records stored as one JSON file per project
#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a project's record
    pub fn record_path(&self, project: &str) -> PathBuf {
        self.dir.join(format!("{}.state", project))
    }

    fn lock_path(&self, project: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", project))
    }

    async fn ensure_dir(&self) -> TierboxResult<()> {
        fs::create_dir_all(&self.dir).await.map_err(|e| {
            TierboxError::io(format!("creating state directory {}", self.dir.display()), e)
        })
    }
}

#[async_trait]
impl BuildStateStore for FileStateStore {
    async fn load(&self, project: &str) -> Option<BuildStateRecord> {
        let path = self.record_path(project);

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No build state for {}", project);
                return None;
            }
            Err(e) => {
                warn!("Cannot read build state {}: {}", path.display(), e);
                return None;
            }
        };

        match BuildStateRecord::parse(project, &content) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Ignoring malformed build state {}: {}", path.display(), e);
                None
            }
        }
    }

    async fn save(&self, project: &str, record: &BuildStateRecord) -> TierboxResult<()> {
        let persist_err = |reason: String| TierboxError::StatePersist {
            project: project.to_string(),
            reason,
        };

        self.ensure_dir().await?;
        let content = serde_json::to_string_pretty(record)?;

        // Write-then-rename so readers never observe a partial record
        let path = self.record_path(project);
        let tmp = self.dir.join(format!(".{}.state.tmp", project));
        fs::write(&tmp, content)
            .await
            .map_err(|e| persist_err(format!("writing {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| persist_err(format!("renaming into {}: {}", path.display(), e)))?;

        debug!("Saved build state {}", path.display());
        Ok(())
    }

    async fn remove(&self, project: &str) -> CleanupResult {
        let path = self.record_path(project);
        let action = format!("remove build state {}", path.display());

        match fs::remove_file(&path).await {
            Ok(()) => CleanupResult::done(action),
            Err(e) if e.kind() == io::ErrorKind::NotFound => CleanupResult::skipped(action),
            Err(e) => CleanupResult::failed(action, e),
        }
    }

    async fn lock(&self, project: &str) -> TierboxResult<StateLock> {
        self.ensure_dir().await?;
        let path = self.lock_path(project);
        let lock_err = |source: io::Error| TierboxError::StateLock {
            path: path.clone(),
            source,
        };

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(lock_err)?;

        match try_lock(&file) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                warn!("Another tierbox is building {}, waiting", project);
                let file = tokio::task::spawn_blocking(move || lock_blocking(&file).map(|()| file))
                    .await
                    .map_err(|e| TierboxError::Internal(format!("lock task failed: {}", e)))?
                    .map_err(lock_err)?;
                return Ok(StateLock { _file: Some(file) });
            }
            Err(e) => return Err(lock_err(e)),
        }

        Ok(StateLock { _file: Some(file) })
    }
}

#[cfg(unix)]
fn flock(file: &File, operation: rustix::fs::FlockOperation) -> io::Result<()> {
    use std::os::unix::io::AsFd;

    rustix::fs::flock(file.as_fd(), operation)
        .map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(unix)]
fn try_lock(file: &File) -> io::Result<()> {
    flock(file, rustix::fs::FlockOperation::NonBlockingLockExclusive)
}

#[cfg(unix)]
fn lock_blocking(file: &File) -> io::Result<()> {
    flock(file, rustix::fs::FlockOperation::LockExclusive)
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> io::Result<()> {
    Ok(())
}

#[cfg(not(unix))]
fn lock_blocking(_file: &File) -> io::Result<()> {
    Ok(())
}
