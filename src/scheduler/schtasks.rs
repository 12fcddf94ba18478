//! Windows Task Scheduler backend driving `schtasks.exe`

use std::process::{Command, Output};

use super::{RunLevel, ScheduledTaskDescriptor, TaskScheduler, TaskTrigger};
use crate::errors::{Result, WatchError};

/// Longest scheduler message kept in an error
const MAX_DETAIL: usize = 180;

#[derive(Debug, Default, Clone, Copy)]
pub struct Schtasks;

impl Schtasks {
    fn run(action: &'static str, args: &[&str]) -> Result<Output> {
        if !cfg!(windows) {
            return Err(WatchError::scheduler(
                action,
                "the Windows task scheduler is not available on this platform",
            ));
        }
        Command::new("schtasks")
            .args(args)
            .output()
            .map_err(|e| WatchError::scheduler(action, format!("cannot run schtasks: {e}")))
    }

    fn failure(action: &'static str, output: &Output) -> WatchError {
        WatchError::scheduler(action, output_detail(output))
    }
}

impl TaskScheduler for Schtasks {
    fn create(&self, task: &ScheduledTaskDescriptor) -> Result<()> {
        let trigger = match task.trigger {
            TaskTrigger::AtLogon => "ONLOGON",
        };
        let level = match task.run_level {
            RunLevel::Limited => "LIMITED",
        };
        let output = Self::run(
            "create",
            &[
                "/Create",
                "/F",
                "/TN",
                task.name.as_str(),
                "/SC",
                trigger,
                "/RL",
                level,
                "/TR",
                task.command_line.as_str(),
            ],
        )?;
        if !output.status.success() {
            return Err(Self::failure("create", &output));
        }
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<bool> {
        let output = Self::run("delete", &["/Delete", "/F", "/TN", name])?;
        if output.status.success() {
            return Ok(true);
        }
        // schtasks reports a missing task as a plain failure; tell it apart
        // from a real one by asking whether the task is there at all.
        if !self.exists(name)? {
            return Ok(false);
        }
        Err(Self::failure("delete", &output))
    }

    fn exists(&self, name: &str) -> Result<bool> {
        let output = Self::run("query", &["/Query", "/TN", name])?;
        Ok(output.status.success())
    }
}

/// Trimmed stderr (or stdout) of a failed call
fn output_detail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let message = if stderr.trim().is_empty() {
        stdout.trim().to_string()
    } else {
        stderr.trim().to_string()
    };

    if message.is_empty() {
        return format!("schtasks exited with {}", output.status);
    }
    if message.chars().count() > MAX_DETAIL {
        let cut: String = message.chars().take(MAX_DETAIL).collect();
        return format!("{cut}...");
    }
    message
}
