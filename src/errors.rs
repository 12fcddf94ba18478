//! Crate-wide error type.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    /// None of the runtime candidates exist on this machine.
    #[error("No runtime found to launch the companion (searched: {searched})")]
    RuntimeNotFound { searched: String },

    #[error("Failed to launch {program:?}: {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Process enumeration failed: {0}")]
    Probe(String),

    #[error("Task scheduler {action} failed: {detail}")]
    Scheduler { action: &'static str, detail: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl WatchError {
    pub fn scheduler(action: &'static str, detail: impl Into<String>) -> Self {
        Self::Scheduler {
            action,
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WatchError>;
