//! Shared fakes for the integration tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use worldrec_watch::config::{CompanionConfig, SupervisorConfig, TargetConfig};
use worldrec_watch::process::{
    LaunchRequest, Launcher, ProcessEntry, ProcessProbe, RuntimeEnvironment, RuntimeResolver,
    TableProbe,
};
use worldrec_watch::supervisor::Supervisor;
use worldrec_watch::{Result, WatchError};

/// Files and PATH aliases that "exist" for the resolver
#[derive(Debug, Clone, Default)]
pub struct FakeEnvironment {
    files: HashSet<PathBuf>,
    aliases: HashMap<String, PathBuf>,
}

impl FakeEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.insert(path.into());
        self
    }

    pub fn with_alias(mut self, alias: &str, path: impl Into<PathBuf>) -> Self {
        self.aliases.insert(alias.to_string(), path.into());
        self
    }
}

impl RuntimeEnvironment for FakeEnvironment {
    fn is_file(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    fn which(&self, alias: &str) -> Option<PathBuf> {
        self.aliases.get(alias).cloned()
    }
}

/// Launcher that records requests instead of spawning
#[derive(Debug, Clone, Default)]
pub struct RecordingLauncher {
    requests: Arc<Mutex<Vec<LaunchRequest>>>,
    fail: bool,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<LaunchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Launcher for RecordingLauncher {
    fn launch(&self, request: &LaunchRequest) -> Result<()> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(WatchError::Launch {
                program: request.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            });
        }
        Ok(())
    }
}

/// Probe answering from a script; errors on the polls listed in `fail_on`.
pub struct ScriptedProbe {
    target: bool,
    companion: bool,
    fail_on: Mutex<VecDeque<bool>>,
    calls: Arc<Mutex<usize>>,
}

impl ScriptedProbe {
    pub fn new(target: bool, companion: bool) -> Self {
        Self {
            target,
            companion,
            fail_on: Mutex::new(VecDeque::new()),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// `pattern[i]` true means the i-th target query fails
    pub fn failing(mut self, pattern: &[bool]) -> Self {
        self.fail_on = Mutex::new(pattern.iter().copied().collect());
        self
    }

    pub fn call_counter(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.calls)
    }
}

impl ProcessProbe for ScriptedProbe {
    fn is_target_running(&self) -> Result<bool> {
        *self.calls.lock().unwrap() += 1;
        if self.fail_on.lock().unwrap().pop_front().unwrap_or(false) {
            return Err(WatchError::Probe("access denied".to_string()));
        }
        Ok(self.target)
    }

    fn is_companion_running(&self) -> Result<bool> {
        Ok(self.companion)
    }
}

pub fn vrchat() -> ProcessEntry {
    ProcessEntry::new(100, "VRChat.exe", "C:\\VRChat\\VRChat.exe")
}

pub fn explorer() -> ProcessEntry {
    ProcessEntry::new(4, "explorer.exe", "C:\\Windows\\explorer.exe")
}

pub fn table_probe(processes: Vec<ProcessEntry>) -> TableProbe<Vec<ProcessEntry>> {
    TableProbe::new(processes, TargetConfig::default(), CompanionConfig::default())
}

pub fn install_dir() -> PathBuf {
    PathBuf::from("C:/Apps/WorldRec")
}

pub fn resolver(env: FakeEnvironment) -> RuntimeResolver {
    RuntimeResolver::new(Box::new(env), install_dir(), CompanionConfig::default())
}

pub fn supervisor(
    probe: impl ProcessProbe + 'static,
    env: FakeEnvironment,
    launcher: RecordingLauncher,
) -> Supervisor {
    Supervisor::new(
        SupervisorConfig::new(5, "test-task").unwrap(),
        Box::new(probe),
        resolver(env),
        Box::new(launcher),
        CompanionConfig::default().start_flag,
    )
}
