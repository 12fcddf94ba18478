//! Process-side building blocks of the supervisor

pub mod launcher;
pub mod lock;
pub mod probe;
pub mod runtime;

pub use launcher::{DetachedLauncher, LaunchRequest, Launcher};
pub use lock::InstanceLock;
pub use probe::{interpreter_matches, names_match, ProcessEntry, ProcessProbe, ProcessTable, SystemProcessTable, TableProbe};
pub use runtime::{
    RuntimeCandidate, RuntimeEnvironment, RuntimeResolver, RuntimeTier, SystemEnvironment,
};
