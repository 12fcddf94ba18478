//! Process probe - is the target up, is the companion up

use std::sync::Arc;
use sysinfo::System;

use crate::config::{CompanionConfig, TargetConfig};
use crate::errors::{Result, WatchError};
use crate::process::runtime::launchable_interpreters;

/// One row of the OS process table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
    /// Full command line, arguments joined by spaces
    pub cmd: String,
}

impl ProcessEntry {
    pub fn new(pid: u32, name: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
            cmd: cmd.into(),
        }
    }
}

/// Read-only view of the running processes.
///
/// Every call must observe the table fresh; implementations never cache.
pub trait ProcessTable: Send + Sync {
    fn snapshot(&self) -> Result<Vec<ProcessEntry>>;
}

/// The two presence queries the supervisor loop asks each poll.
pub trait ProcessProbe: Send + Sync {
    fn is_target_running(&self) -> Result<bool>;
    fn is_companion_running(&self) -> Result<bool>;
}

/// Live process table backed by `sysinfo`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessTable;

impl ProcessTable for SystemProcessTable {
    fn snapshot(&self) -> Result<Vec<ProcessEntry>> {
        let mut sys = System::new();
        sys.refresh_processes();

        let entries: Vec<ProcessEntry> = sys
            .processes()
            .iter()
            .map(|(pid, proc)| ProcessEntry {
                pid: pid.as_u32(),
                name: proc.name().to_string(),
                cmd: proc.cmd().join(" "),
            })
            .collect();

        // An empty table means enumeration was refused, not that nothing runs.
        if entries.is_empty() {
            return Err(WatchError::Probe("process table came back empty".to_string()));
        }

        Ok(entries)
    }
}

/// Fixed tables, mostly for tests and diagnostics
impl ProcessTable for Vec<ProcessEntry> {
    fn snapshot(&self) -> Result<Vec<ProcessEntry>> {
        Ok(self.clone())
    }
}

impl<T: ProcessTable + ?Sized> ProcessTable for Arc<T> {
    fn snapshot(&self) -> Result<Vec<ProcessEntry>> {
        (**self).snapshot()
    }
}

/// Matches a process table against the target and companion identities
pub struct TableProbe<T> {
    table: T,
    target: TargetConfig,
    companion: CompanionConfig,
}

impl<T: ProcessTable> TableProbe<T> {
    /// The interpreter set always covers what the resolver may launch, so a
    /// companion started by this supervisor is recognised on the next poll.
    pub fn new(table: T, target: TargetConfig, mut companion: CompanionConfig) -> Self {
        for name in launchable_interpreters() {
            if !companion.interpreters.iter().any(|i| names_match(i, &name)) {
                companion.interpreters.push(name);
            }
        }
        Self {
            table,
            target,
            companion,
        }
    }

    fn is_companion_entry(&self, entry: &ProcessEntry) -> bool {
        if names_match(&entry.name, &self.companion.executable) {
            return true;
        }

        // Interpreted form: the process name alone cannot tell it apart from
        // any other script, so the command line has to carry the marker.
        self.companion
            .interpreters
            .iter()
            .any(|interp| interpreter_matches(&entry.name, interp))
            && entry.cmd.contains(&self.companion.module_marker)
    }
}

impl<T: ProcessTable> ProcessProbe for TableProbe<T> {
    fn is_target_running(&self) -> Result<bool> {
        let processes = self.table.snapshot()?;
        Ok(processes
            .iter()
            .any(|p| names_match(&p.name, &self.target.process_name)))
    }

    fn is_companion_running(&self) -> Result<bool> {
        let processes = self.table.snapshot()?;
        Ok(processes.iter().any(|p| self.is_companion_entry(p)))
    }
}

/// Compare process names ignoring ASCII case and a trailing `.exe`
pub fn names_match(actual: &str, expected: &str) -> bool {
    strip_exe(actual).eq_ignore_ascii_case(strip_exe(expected))
}

/// Like [`names_match`], but also accepts versioned names: `python3` matches `python3.12`.
pub fn interpreter_matches(actual: &str, interpreter: &str) -> bool {
    if names_match(actual, interpreter) {
        return true;
    }
    let actual = strip_exe(actual);
    let interpreter = strip_exe(interpreter);
    let Some(prefix) = actual.get(..interpreter.len()) else {
        return false;
    };
    let suffix = &actual[interpreter.len()..];
    prefix.eq_ignore_ascii_case(interpreter)
        && suffix.starts_with('.')
        && suffix.len() > 1
        && suffix[1..].chars().all(|c| c.is_ascii_digit() || c == '.')
}

fn strip_exe(name: &str) -> &str {
    let len = name.len();
    if len > 4 && name.is_char_boundary(len - 4) && name[len - 4..].eq_ignore_ascii_case(".exe") {
        &name[..len - 4]
    } else {
        name
    }
}
