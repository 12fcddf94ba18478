//! Runtime resolution - decide which executable starts the companion.
//!
//! The companion ships either as a packaged executable or as a Python
//! project. Candidates are probed in a fixed priority order and the first
//! one present wins:
//!
//! 1. the packaged executable in the install directory
//! 2. the windowless interpreter of the project-local virtualenv
//! 3. a windowless interpreter alias on `PATH`
//! 4. a standard interpreter alias on `PATH`
//!
//! Nothing is cached; every launch attempt re-checks the filesystem and
//! `PATH`, since either may have changed since the previous poll.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::CompanionConfig;
use crate::errors::{Result, WatchError};

/// Interpreter inside the project-local virtualenv, relative to the install dir.
#[cfg(windows)]
pub const LOCAL_RUNTIME: &str = ".venv/Scripts/pythonw.exe";
#[cfg(not(windows))]
pub const LOCAL_RUNTIME: &str = ".venv/bin/python3";

/// Interpreter alias that starts without a console window.
pub const WINDOWLESS_ALIAS: &str = "pythonw";

/// Interpreter alias that is always installed alongside Python.
pub const STANDARD_ALIAS: &str = "python";

/// Process names of every interpreter the resolver can launch the companion with.
pub fn launchable_interpreters() -> Vec<String> {
    let local = Path::new(LOCAL_RUNTIME)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());
    local
        .into_iter()
        .chain([WINDOWLESS_ALIAS.to_string(), STANDARD_ALIAS.to_string()])
        .collect()
}

/// Filesystem and `PATH` lookups the resolver depends on.
pub trait RuntimeEnvironment: Send + Sync {
    fn is_file(&self, path: &Path) -> bool;
    fn which(&self, alias: &str) -> Option<PathBuf>;
}

/// The real machine
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemEnvironment;

impl RuntimeEnvironment for SystemEnvironment {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn which(&self, alias: &str) -> Option<PathBuf> {
        which::which(alias).ok()
    }
}

/// The ways of starting the companion, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeTier {
    PackagedExecutable,
    LocalRuntime,
    WindowlessAlias,
    StandardAlias,
}

impl RuntimeTier {
    pub const PRIORITY: [RuntimeTier; 4] = [
        RuntimeTier::PackagedExecutable,
        RuntimeTier::LocalRuntime,
        RuntimeTier::WindowlessAlias,
        RuntimeTier::StandardAlias,
    ];

    /// Build this tier's candidate if its executable is present.
    fn probe(
        self,
        env: &dyn RuntimeEnvironment,
        install_dir: &Path,
        companion: &CompanionConfig,
    ) -> Option<RuntimeCandidate> {
        let program = match self {
            RuntimeTier::PackagedExecutable => {
                let exe = install_dir.join(&companion.executable);
                return env.is_file(&exe).then(|| RuntimeCandidate {
                    tier: self,
                    program: exe,
                    args: Vec::new(),
                });
            }
            RuntimeTier::LocalRuntime => {
                let interp = install_dir.join(LOCAL_RUNTIME);
                env.is_file(&interp).then_some(interp)?
            }
            RuntimeTier::WindowlessAlias => env.which(WINDOWLESS_ALIAS)?,
            RuntimeTier::StandardAlias => env.which(STANDARD_ALIAS)?,
        };

        Some(RuntimeCandidate {
            tier: self,
            program,
            args: module_args(companion),
        })
    }

    /// Where this tier looks, for error reports
    fn location(self, install_dir: &Path, companion: &CompanionConfig) -> String {
        match self {
            RuntimeTier::PackagedExecutable => {
                install_dir.join(&companion.executable).display().to_string()
            }
            RuntimeTier::LocalRuntime => install_dir.join(LOCAL_RUNTIME).display().to_string(),
            RuntimeTier::WindowlessAlias => format!("PATH:{WINDOWLESS_ALIAS}"),
            RuntimeTier::StandardAlias => format!("PATH:{STANDARD_ALIAS}"),
        }
    }
}

impl fmt::Display for RuntimeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RuntimeTier::PackagedExecutable => "packaged executable",
            RuntimeTier::LocalRuntime => "local runtime",
            RuntimeTier::WindowlessAlias => "windowless alias",
            RuntimeTier::StandardAlias => "standard alias",
        };
        f.write_str(label)
    }
}

/// Interpreter arguments that select the companion's entry module.
fn module_args(companion: &CompanionConfig) -> Vec<String> {
    vec!["-m".to_string(), companion.module_marker.clone()]
}

/// One concrete way to start the companion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeCandidate {
    pub tier: RuntimeTier,
    pub program: PathBuf,
    /// Entry-point arguments, without the start flag
    pub args: Vec<String>,
}

/// Picks the best available [`RuntimeCandidate`] for an install directory.
pub struct RuntimeResolver {
    env: Box<dyn RuntimeEnvironment>,
    install_dir: PathBuf,
    companion: CompanionConfig,
}

impl RuntimeResolver {
    pub fn new(
        env: Box<dyn RuntimeEnvironment>,
        install_dir: impl Into<PathBuf>,
        companion: CompanionConfig,
    ) -> Self {
        Self {
            env,
            install_dir: install_dir.into(),
            companion,
        }
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    /// # Errors
    ///
    /// [`WatchError::RuntimeNotFound`] when no tier is present.
    pub fn resolve(&self) -> Result<RuntimeCandidate> {
        RuntimeTier::PRIORITY
            .iter()
            .find_map(|tier| tier.probe(self.env.as_ref(), &self.install_dir, &self.companion))
            .ok_or_else(|| WatchError::RuntimeNotFound {
                searched: RuntimeTier::PRIORITY
                    .iter()
                    .map(|tier| tier.location(&self.install_dir, &self.companion))
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}
