//! Timestamped backups of the active configuration.
//!
//! # Layout
//! ```text
//! <backup_dir>/cfg_<HH>_<MM>_<ddmmyy>
//! ```
//!
//! # Design Decisions
//! - Backups are never pruned
//! - Leftover `.swap` files from an interrupted copy are never listed
//! - Two backups in the same minute share a name; the later replaces the earlier
//! - "Most recent" is decided by file creation time, falling back to
//!   modification time where the file system does not record creation

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};

use crate::deploy::ops::{ConfigFiles, SWAP_SUFFIX};
use crate::deploy::DeployError;

/// File name prefix shared by every backup.
pub const BACKUP_PREFIX: &str = "cfg_";

const NAME_FORMAT: &str = "cfg_%H_%M_%d%m%y";

/// One stored copy of a previously active configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSnapshot {
    pub path: PathBuf,
    pub created: SystemTime,
}

impl BackupSnapshot {
    pub fn taken_at(&self) -> DateTime<Local> {
        self.created.into()
    }
}

/// Owns the backup directory.
#[derive(Debug, Clone)]
pub struct BackupManager {
    dir: PathBuf,
}

fn created_time(path: &Path) -> io::Result<SystemTime> {
    let meta = std::fs::metadata(path)?;
    meta.created().or_else(|_| meta.modified())
}

impl BackupManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Backup file name for a given moment.
    pub fn name_for(at: DateTime<Local>) -> String {
        at.format(NAME_FORMAT).to_string()
    }

    /// Copy `active` into the backup directory.
    ///
    /// Returns `Ok(None)` when there is no active configuration yet.
    pub async fn create<F>(&self, files: &F, active: &Path) -> Result<Option<BackupSnapshot>, DeployError>
    where
        F: ConfigFiles + ?Sized,
    {
        if !tokio::fs::try_exists(active).await.unwrap_or(true) {
            return Ok(None);
        }

        let backup_err = |source| DeployError::Backup {
            path: active.display().to_string(),
            source,
        };

        tokio::fs::create_dir_all(&self.dir).await.map_err(backup_err)?;
        let path = self.dir.join(Self::name_for(Local::now()));
        files.copy(active, &path).await.map_err(backup_err)?;
        let created = created_time(&path).map_err(backup_err)?;

        Ok(Some(BackupSnapshot { path, created }))
    }

    /// Every backup, newest first. A missing directory holds no backups.
    pub fn list(&self) -> io::Result<Vec<BackupSnapshot>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut snapshots = Vec::new();
        for entry in entries {
            let entry = entry?;
            let is_backup = entry
                .file_name()
                .to_str()
                .is_some_and(|n| n.starts_with(BACKUP_PREFIX) && !n.ends_with(SWAP_SUFFIX));
            if !is_backup || !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            let created = created_time(&path)?;
            snapshots.push(BackupSnapshot { path, created });
        }

        snapshots.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| b.path.cmp(&a.path)));
        Ok(snapshots)
    }

    /// The most recently created backup.
    pub fn latest(&self) -> io::Result<Option<BackupSnapshot>> {
        Ok(self.list()?.into_iter().next())
    }
}
