//! Single-instance lock for the supervisor loop

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sysinfo::{Pid, System};

use crate::errors::Result;

/// How long a lock file without a readable PID still counts as held
pub const UNREADABLE_GRACE: Duration = Duration::from_secs(10);

/// PID file held for as long as the supervisor runs; removed on drop
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
}

impl InstanceLock {
    /// Default lock location: <data_local_dir>/WorldRec/watch.lock
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("WorldRec")
            .join("watch.lock")
    }

    /// Take the lock, replacing it if its holder is gone.
    ///
    /// The PID is written to a private staging file first and hard-linked
    /// into place, so the lock never exists without its PID.
    /// Returns `Ok(None)` when another live supervisor holds it.
    pub fn acquire(path: &Path) -> Result<Option<Self>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let staging = staging_path(path);
        fs::write(&staging, std::process::id().to_string())?;
        let result = Self::link_into_place(&staging, path);
        let _ = fs::remove_file(&staging);
        result
    }

    fn link_into_place(staging: &Path, path: &Path) -> Result<Option<Self>> {
        // Two attempts: the second one follows removal of a stale file.
        for _ in 0..2 {
            match fs::hard_link(staging, path) {
                Ok(()) => {
                    return Ok(Some(Self {
                        path: path.to_path_buf(),
                    }))
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if Self::is_held(path) {
                        return Ok(None);
                    }
                    tracing::info!(path = %path.display(), "removing stale instance lock");
                    match fs::remove_file(path) {
                        Ok(()) => {}
                        Err(e) if e.kind() == ErrorKind::NotFound => {}
                        Err(e) => return Err(e.into()),
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(None)
    }

    /// Whether an existing lock file belongs to another running supervisor
    fn is_held(path: &Path) -> bool {
        match Self::holder(path) {
            Some(pid) => pid != std::process::id() && pid_alive(pid),
            None => recently_modified(path),
        }
    }

    /// PID recorded in a lock file, if readable
    pub fn holder(path: &Path) -> Option<u32> {
        fs::read_to_string(path).ok()?.trim().parse().ok()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if Self::holder(&self.path) == Some(std::process::id()) {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// watch.lock -> watch.lock.<pid>.tmp, next to the lock
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}

fn recently_modified(path: &Path) -> bool {
    match fs::metadata(path).and_then(|m| m.modified()) {
        // A timestamp in the future also counts as recent.
        Ok(modified) => modified
            .elapsed()
            .map_or(true, |age| age < UNREADABLE_GRACE),
        Err(_) => false,
    }
}

fn pid_alive(pid: u32) -> bool {
    let pid = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes();
    sys.process(pid).is_some()
}
