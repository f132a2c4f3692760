// ABOUTME: Deploy lock preventing concurrent pipelines against one workspace.
// ABOUTME: Lock info (holder, pid, timestamp) lives in a file under the workspace root.

use crate::connection::ConnectionAdapter;
use crate::deployment::Workspace;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

const LOCK_FILENAME: &str = ".shipwright.lock";

#[derive(Debug, Error)]
pub enum LockError {
    #[error("deployment locked by {holder} (pid {pid}) since {since}")]
    Held {
        holder: String,
        pid: u32,
        since: DateTime<Utc>,
    },

    #[error("lock operation failed: {0}")]
    Failed(String),
}

/// Information about who holds a deploy lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    /// Process ID of the lock holder.
    pub pid: u32,
    /// When the lock was acquired.
    pub acquired_at: DateTime<Utc>,
}

impl LockInfo {
    /// Lock info for the current process.
    pub fn for_current_process() -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            acquired_at: Utc::now(),
        }
    }

    /// A lock older than an hour is considered abandoned.
    pub fn is_stale(&self) -> bool {
        let age = Utc::now() - self.acquired_at;
        age.num_hours() >= 1
    }
}

/// A held deploy lock on one workspace.
pub struct DeployLock {
    adapter: Arc<dyn ConnectionAdapter>,
    path: PathBuf,
}

impl std::fmt::Debug for DeployLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeployLock").field("path", &self.path).finish()
    }
}

impl DeployLock {
    /// Acquires the lock for the workspace.
    ///
    /// Stale locks (older than one hour) and locks with unreadable info are
    /// broken with a warning; `force` breaks any lock.
    ///
    /// # Errors
    ///
    /// Returns `LockError::Held` with the holder's info when another
    /// process holds a valid lock.
    pub async fn acquire(
        adapter: Arc<dyn ConnectionAdapter>,
        workspace: &Workspace,
        force: bool,
    ) -> Result<Self, LockError> {
        let path = workspace.root().join(LOCK_FILENAME);

        adapter
            .create_directory(workspace.root())
            .await
            .map_err(|e| LockError::Failed(format!("failed to create workspace root: {}", e)))?;

        let exists = adapter
            .exists(&path)
            .await
            .map_err(|e| LockError::Failed(format!("failed to check lock: {}", e)))?;

        if exists {
            let should_break = Self::check_existing(&adapter, &path, force).await?;
            if !should_break {
                let contents = adapter
                    .read_file(&path)
                    .await
                    .map_err(|e| LockError::Failed(format!("failed to read lock info: {}", e)))?;
                if let Ok(existing) = serde_json::from_str::<LockInfo>(&contents) {
                    return Err(LockError::Held {
                        holder: existing.holder,
                        pid: existing.pid,
                        since: existing.acquired_at,
                    });
                }
                return Err(LockError::Failed(
                    "lock held by another process".to_string(),
                ));
            }

            tracing::debug!(path = %path.display(), "removing stale or forced lock");
            let _ = adapter.remove(&path).await;
        }

        let info = LockInfo::for_current_process();
        let contents = serde_json::to_string(&info)
            .map_err(|e| LockError::Failed(format!("failed to serialize lock: {}", e)))?;
        adapter
            .write_file(&path, &contents)
            .await
            .map_err(|e| LockError::Failed(format!("failed to acquire lock: {}", e)))?;

        Ok(Self { adapter, path })
    }

    /// Whether an existing lock should be broken (stale, forced, corrupted).
    async fn check_existing(
        adapter: &Arc<dyn ConnectionAdapter>,
        path: &std::path::Path,
        force: bool,
    ) -> Result<bool, LockError> {
        let contents = match adapter.read_file(path).await {
            Ok(contents) => contents,
            Err(_) => {
                tracing::warn!("lock info unreadable, breaking lock");
                return Ok(true);
            }
        };

        match serde_json::from_str::<LockInfo>(&contents) {
            Ok(existing) => {
                if force {
                    tracing::warn!(
                        "breaking lock held by {} (pid {}) since {}",
                        existing.holder,
                        existing.pid,
                        existing.acquired_at
                    );
                    Ok(true)
                } else if existing.is_stale() {
                    tracing::warn!(
                        "auto-breaking stale lock held by {} (pid {}) since {}",
                        existing.holder,
                        existing.pid,
                        existing.acquired_at
                    );
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Err(_) => {
                tracing::warn!("lock info corrupted, breaking lock");
                Ok(true)
            }
        }
    }

    /// Releases the lock.
    pub async fn release(self) -> Result<(), LockError> {
        let _ = self.adapter.remove(&self.path).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_info_records_current_host_and_pid() {
        let info = LockInfo::for_current_process();
        assert_eq!(info.pid, std::process::id());
        assert!(!info.holder.is_empty());
    }

    #[test]
    fn fresh_lock_is_not_stale() {
        assert!(!LockInfo::for_current_process().is_stale());
    }

    #[test]
    fn old_lock_is_stale() {
        let mut info = LockInfo::for_current_process();
        info.acquired_at = Utc::now() - chrono::Duration::hours(2);
        assert!(info.is_stale());
    }

    #[test]
    fn lock_info_round_trips_through_json() {
        let info = LockInfo::for_current_process();
        let json = serde_json::to_string(&info).unwrap();
        let parsed: LockInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.holder, info.holder);
        assert_eq!(parsed.pid, info.pid);
    }
}
