use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::errors::{Result, WatchError};
use crate::process::{ProcessTable, RuntimeEnvironment, RuntimeResolver, TableProbe};

/// Name of the logon task when none is given on the command line.
pub const DEFAULT_TASK_NAME: &str = "WorldRec-VRChat-AutoStart";

/// Seconds between two polls of the process table.
pub const DEFAULT_POLL_SECONDS: u64 = 60;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Directory holding the companion; defaults to the supervisor's own directory
    pub install_dir: Option<PathBuf>,
    pub target: TargetConfig,
    pub companion: CompanionConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub process_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompanionConfig {
    /// Packaged executable name, looked up in the install directory
    pub executable: String,
    /// Substring identifying the companion in an interpreter's command line
    pub module_marker: String,
    /// Interpreter process names that may host the companion
    pub interpreters: Vec<String>,
    /// Flag passed on every launch
    pub start_flag: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            process_name: "VRChat.exe".to_string(),
        }
    }
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            executable: "WorldRec.exe".to_string(),
            module_marker: "app.main".to_string(),
            interpreters: default_interpreters(),
            start_flag: "--start-minimized".to_string(),
        }
    }
}

fn default_interpreters() -> Vec<String> {
    let mut names = vec!["python.exe", "pythonw.exe", "py.exe", "pyw.exe"];
    if cfg!(not(windows)) {
        names.push("python3");
    }
    names.into_iter().map(str::to_string).collect()
}

impl WatchConfig {
    /// Load from an explicit path, or from the first well-known location that parses.
    ///
    /// An explicit path must exist and parse; implicit locations are skipped on error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let paths = [
            dirs::config_dir().map(|p| p.join("worldrec/watch.toml")),
            dirs::home_dir().map(|p| p.join(".worldrec-watch.toml")),
        ];

        for path in paths.into_iter().flatten() {
            if path.exists() {
                match Self::from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => tracing::warn!(path = %path.display(), error = %e, "ignoring config file"),
                }
            }
        }

        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| WatchError::Config(format!("cannot read {}: {e}", path.display())))?;
        Ok(toml::from_str(&content)?)
    }

    /// Target and companion detection for this config over `table`.
    pub fn process_view<T: ProcessTable>(&self, table: T) -> TableProbe<T> {
        TableProbe::new(table, self.target.clone(), self.companion.clone())
    }

    /// Resolver for this config's companion in the resolved install directory.
    pub fn resolver(&self, env: Box<dyn RuntimeEnvironment>) -> Result<RuntimeResolver> {
        Ok(RuntimeResolver::new(
            env,
            self.resolve_install_dir()?,
            self.companion.clone(),
        ))
    }

    /// The configured install directory, or the directory of the running executable.
    pub fn resolve_install_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.install_dir {
            return Ok(dir.clone());
        }
        let exe = std::env::current_exe()?;
        exe.parent().map(Path::to_path_buf).ok_or_else(|| {
            WatchError::Config(format!("executable has no parent dir: {}", exe.display()))
        })
    }
}

/// Settings fixed for the lifetime of one supervisor process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    poll_interval_seconds: u64,
    task_name: String,
}

impl SupervisorConfig {
    pub fn new(poll_interval_seconds: u64, task_name: impl Into<String>) -> Result<Self> {
        if poll_interval_seconds == 0 {
            return Err(WatchError::Config(
                "poll interval must be a positive number of seconds".to_string(),
            ));
        }
        let task_name = task_name.into();
        if task_name.trim().is_empty() {
            return Err(WatchError::Config("task name must not be empty".to_string()));
        }
        Ok(Self {
            poll_interval_seconds,
            task_name,
        })
    }

    pub fn poll_interval_seconds(&self) -> u64 {
        self.poll_interval_seconds
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn task_name(&self) -> &str {
        &self.task_name
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: DEFAULT_POLL_SECONDS,
            task_name: DEFAULT_TASK_NAME.to_string(),
        }
    }
}
