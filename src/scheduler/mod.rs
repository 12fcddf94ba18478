//! Logon task registration.
//!
//! The OS task scheduler is the only record of whether the supervisor will
//! start at the next logon; nothing is tracked locally. Both operations are
//! idempotent: registering replaces any task with the same name, and
//! removing a task that does not exist succeeds.

pub mod memory;
pub mod schtasks;

use std::path::{Path, PathBuf};

use crate::config::SupervisorConfig;
use crate::errors::{Result, WatchError};

pub use memory::InMemoryScheduler;
pub use schtasks::Schtasks;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskTrigger {
    AtLogon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunLevel {
    Limited,
}

/// A task as handed to the scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTaskDescriptor {
    pub name: String,
    pub trigger: TaskTrigger,
    pub run_level: RunLevel,
    pub command_line: String,
}

/// Create/delete access to the OS scheduling facility
pub trait TaskScheduler: Send + Sync {
    /// Create the task, replacing one with the same name.
    fn create(&self, task: &ScheduledTaskDescriptor) -> Result<()>;
    /// Delete the task. Returns `false` when no such task existed.
    fn delete(&self, name: &str) -> Result<bool>;
    fn exists(&self, name: &str) -> Result<bool>;
}

/// Registers and removes the supervisor's logon task
pub struct Registrar {
    scheduler: Box<dyn TaskScheduler>,
    program: PathBuf,
    config_path: Option<PathBuf>,
}

impl Registrar {
    /// `program` is the supervisor executable the task will start.
    pub fn new(scheduler: Box<dyn TaskScheduler>, program: impl Into<PathBuf>) -> Self {
        Self {
            scheduler,
            program: program.into(),
            config_path: None,
        }
    }

    /// Carry an explicit config file into the scheduled command line.
    ///
    /// The task starts from the scheduler's working directory, so the path is
    /// made absolute here and must point at an existing file.
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Result<Self> {
        self.config_path = match path {
            Some(path) => Some(absolute_config_path(&path)?),
            None => None,
        };
        Ok(self)
    }

    /// Command that starts the supervisor loop with the given interval
    pub fn command_line(&self, poll_interval_seconds: u64) -> String {
        let mut cmd = quote(&self.program.display().to_string());
        if let Some(config) = &self.config_path {
            cmd.push_str(" --config ");
            cmd.push_str(&quote(&config.display().to_string()));
        }
        cmd.push_str(&format!(" run --poll-seconds {poll_interval_seconds}"));
        cmd
    }

    pub fn descriptor(&self, config: &SupervisorConfig) -> ScheduledTaskDescriptor {
        ScheduledTaskDescriptor {
            name: config.task_name().to_string(),
            trigger: TaskTrigger::AtLogon,
            run_level: RunLevel::Limited,
            command_line: self.command_line(config.poll_interval_seconds()),
        }
    }

    /// Create (or overwrite) the logon task.
    pub fn register(
        &self,
        task_name: &str,
        poll_interval_seconds: u64,
    ) -> Result<ScheduledTaskDescriptor> {
        let config = SupervisorConfig::new(poll_interval_seconds, task_name)?;
        let task = self.descriptor(&config);
        self.scheduler.create(&task)?;
        tracing::info!(task = %task.name, command = %task.command_line, "logon task registered");
        Ok(task)
    }

    /// Remove the logon task. Returns whether a task was actually removed.
    pub fn unregister(&self, task_name: &str) -> Result<bool> {
        if task_name.trim().is_empty() {
            return Err(WatchError::Config("task name must not be empty".to_string()));
        }
        let removed = self.scheduler.delete(task_name)?;
        if removed {
            tracing::info!(task = task_name, "logon task removed");
        } else {
            tracing::info!(task = task_name, "logon task was not registered");
        }
        Ok(removed)
    }

    pub fn is_registered(&self, task_name: &str) -> Result<bool> {
        self.scheduler.exists(task_name)
    }
}

fn absolute_config_path(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path).map_err(|e| {
        WatchError::Config(format!("cannot resolve config path {}: {e}", path.display()))
    })?;
    if !absolute.is_file() {
        return Err(WatchError::Config(format!(
            "config file not found: {}",
            absolute.display()
        )));
    }
    Ok(absolute)
}

fn quote(arg: &str) -> String {
    format!("\"{arg}\"")
}
