//! # File I/O Module
//!
//! Handles project file operations with safety features:
//! - **Atomic saves**: Write to .tmp, sync, rename to prevent corruption
//! - **File locking**: Prevent concurrent edits of one study on shared drives
//! - **Version validation**: Ensure schema compatibility
//!
//! ## File Format
//!
//! Projects are saved as `.lca` files containing JSON.
//! Lock files use the `.lca.lock` extension with metadata about who holds the lock.
//!
//! ## Example
//!
//! ```rust,no_run
//! use lca_core::file_io::{save_project, load_project, FileLock};
//! use lca_core::project::LcaProject;
//! use std::path::Path;
//!
//! let project = LcaProject::new("Office Block B", "A. Planner");
//! let path = Path::new("office.lca");
//!
//! let lock = FileLock::acquire(path, "planner@office.ch").unwrap();
//! save_project(&project, path).unwrap();
//! drop(lock);
//!
//! let reloaded = load_project(path).unwrap();
//! assert_eq!(reloaded.meta.id, project.meta.id);
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::errors::{LcaError, LcaResult};
use crate::project::{LcaProject, SCHEMA_VERSION};

/// Locks older than this are taken over
const STALE_LOCK_HOURS: i64 = 24;

/// Lock file metadata stored in .lca.lock files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// User identifier (email or username)
    pub user_id: String,
    /// Machine name where lock was acquired
    pub machine: String,
    /// Process ID that holds the lock
    pub pid: u32,
    pub locked_at: DateTime<Utc>,
}

impl LockInfo {
    /// Lock info for the current process
    pub fn new(user_id: impl Into<String>) -> Self {
        LockInfo {
            user_id: user_id.into(),
            machine: hostname().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
    }

    /// Held by a process that is gone, or older than a day
    pub fn is_stale(&self) -> bool {
        if hostname().is_some_and(|ours| ours == self.machine) && !process_alive(self.pid) {
            return true;
        }
        (Utc::now() - self.locked_at).num_hours() > STALE_LOCK_HOURS
    }
}

fn hostname() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("COMPUTERNAME").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOSTNAME")
            .ok()
            .or_else(|| std::env::var("HOST").ok())
    }
}

fn process_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        fs::metadata(format!("/proc/{}", pid)).is_ok()
    }
    #[cfg(not(unix))]
    {
        use std::process::Command;
        Command::new("tasklist")
            .args(["/FI", &format!("PID eq {}", pid), "/NH"])
            .output()
            .map(|out| String::from_utf8_lossy(&out.stdout).contains(&pid.to_string()))
            .unwrap_or(true)
    }
}

/// File lock guard that releases the lock when dropped.
///
/// Combines an OS-level exclusive lock (via fs2) with a `.lca.lock` file
/// whose metadata tells other users who is editing the study.
pub struct FileLock {
    project_path: PathBuf,
    lock_path: PathBuf,
    /// Keeps the OS lock
    _lock_file: File,
    pub info: LockInfo,
}

impl FileLock {
    /// Acquire an exclusive lock on a project file.
    ///
    /// # Errors
    ///
    /// * `LcaError::FileLocked` - another live process holds the lock
    /// * `LcaError::FileError` - the lock file cannot be written
    pub fn acquire(path: &Path, user_id: impl Into<String>) -> LcaResult<Self> {
        let lock_path = lock_path_for(path);
        let info = LockInfo::new(user_id);

        if let Some(existing) = FileLock::check(path) {
            return Err(LcaError::file_locked(
                path.display().to_string(),
                format!("{} ({})", existing.user_id, existing.machine),
                existing.locked_at.to_rfc3339(),
            ));
        }

        let mut lock_file = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .map_err(|e| LcaError::file_error("create lock", lock_path.display().to_string(), e.to_string()))?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| LcaError::file_locked(path.display().to_string(), "another process", "unknown"))?;

        let lock_json = serde_json::to_string_pretty(&info)?;
        lock_file
            .write_all(lock_json.as_bytes())
            .and_then(|_| lock_file.sync_all())
            .map_err(|e| LcaError::file_error("write lock", lock_path.display().to_string(), e.to_string()))?;

        Ok(FileLock {
            project_path: path.to_path_buf(),
            lock_path,
            _lock_file: lock_file,
            info,
        })
    }

    /// Current holder of a live lock, if any
    pub fn check(path: &Path) -> Option<LockInfo> {
        read_lock_info(&lock_path_for(path))
            .ok()
            .filter(|info| !info.is_stale())
    }

    pub fn project_path(&self) -> &Path {
        &self.project_path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

/// `study.lca` → `study.lca.<suffix>`
fn sibling_path(project_path: &Path, suffix: &str) -> PathBuf {
    let mut path = project_path.to_path_buf();
    let extension = path
        .extension()
        .map(|e| format!("{}.{}", e.to_string_lossy(), suffix))
        .unwrap_or_else(|| suffix.to_string());
    path.set_extension(extension);
    path
}

fn lock_path_for(project_path: &Path) -> PathBuf {
    sibling_path(project_path, "lock")
}

fn read_lock_info(lock_path: &Path) -> LcaResult<LockInfo> {
    let contents = fs::read_to_string(lock_path)
        .map_err(|e| LcaError::file_error("read lock", lock_path.display().to_string(), e.to_string()))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Save a project with atomic write semantics.
///
/// The project is written to `<path>.tmp`, synced to disk and renamed over
/// `path`, so an interrupted save never leaves a truncated study behind.
pub fn save_project(project: &LcaProject, path: &Path) -> LcaResult<()> {
    let json = serde_json::to_string_pretty(project)?;
    let tmp_path = sibling_path(path, "tmp");

    let mut tmp_file = File::create(&tmp_path)
        .map_err(|e| LcaError::file_error("create temp file", tmp_path.display().to_string(), e.to_string()))?;

    tmp_file
        .write_all(json.as_bytes())
        .map_err(|e| LcaError::file_error("write temp file", tmp_path.display().to_string(), e.to_string()))?;

    tmp_file
        .sync_all()
        .map_err(|e| LcaError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string()))?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        LcaError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    Ok(())
}

/// Load a project from a file.
///
/// # Errors
///
/// * `LcaError::VersionMismatch` - file schema is incompatible
/// * `LcaError::SerializationError` - invalid JSON
/// * `LcaError::FileError` - I/O error
pub fn load_project(path: &Path) -> LcaResult<LcaProject> {
    let contents = fs::read_to_string(path)
        .map_err(|e| LcaError::file_error("read", path.display().to_string(), e.to_string()))?;

    let project: LcaProject = serde_json::from_str(&contents).map_err(|e| LcaError::SerializationError {
        reason: format!("Invalid JSON in {}: {}", path.display(), e),
    })?;

    validate_version(&project.meta.version)?;
    Ok(project)
}

/// Load a project and report who holds its lock, if anyone
pub fn load_project_with_lock_check(path: &Path) -> LcaResult<(LcaProject, Option<LockInfo>)> {
    let project = load_project(path)?;
    Ok((project, FileLock::check(path)))
}

/// Major versions must match; within 0.x a newer minor is rejected.
fn validate_version(file_version: &str) -> LcaResult<()> {
    let parse = |v: &str| -> Vec<u32> { v.split('.').filter_map(|p| p.parse().ok()).collect() };
    let file_parts = parse(file_version);
    let current_parts = parse(SCHEMA_VERSION);

    let mismatch = || LcaError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };

    match (file_parts.as_slice(), current_parts.as_slice()) {
        ([file_major, ..], [major, ..]) if file_major != major => Err(mismatch()),
        ([0, file_minor, ..], [0, minor, ..]) if file_minor > minor => Err(mismatch()),
        ([_, ..], [_, ..]) => Ok(()),
        _ => Err(mismatch()),
    }
}
