//! Detached launch of the companion

use std::path::{Path, PathBuf};
use std::process::Stdio;

use super::runtime::RuntimeCandidate;
use crate::errors::{Result, WatchError};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;
#[cfg(windows)]
const DETACHED_PROCESS: u32 = 0x0000_0008;

/// A fully assembled companion invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl LaunchRequest {
    /// Candidate arguments followed by the start flag, run from the install dir
    pub fn new(candidate: &RuntimeCandidate, start_flag: &str, install_dir: &Path) -> Self {
        let mut args = candidate.args.clone();
        args.push(start_flag.to_string());
        Self {
            program: candidate.program.clone(),
            args,
            working_dir: install_dir.to_path_buf(),
        }
    }
}

/// Starts a process and returns as soon as the OS accepted it.
pub trait Launcher: Send + Sync {
    fn launch(&self, request: &LaunchRequest) -> Result<()>;
}

/// Spawns through `tokio::process` so exited children get reaped in the background.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedLauncher;

impl Launcher for DetachedLauncher {
    fn launch(&self, request: &LaunchRequest) -> Result<()> {
        let mut cmd = tokio::process::Command::new(&request.program);
        cmd.args(&request.args)
            .current_dir(&request.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false);

        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW | DETACHED_PROCESS);

        let child = cmd.spawn().map_err(|source| WatchError::Launch {
            program: request.program.clone(),
            source,
        })?;

        tracing::info!(
            pid = ?child.id(),
            program = %request.program.display(),
            "companion launched"
        );

        // Dropping the handle does not stop the child.
        drop(child);
        Ok(())
    }
}
