//! worldrec-watch library - start WorldRec whenever VRChat runs

pub mod config;
pub mod errors;
pub mod logging;
pub mod process;
pub mod scheduler;
pub mod supervisor;

// Re-export commonly used types
pub use config::{SupervisorConfig, WatchConfig};
pub use errors::{Result, WatchError};
pub use process::{ProcessProbe, RuntimeCandidate, RuntimeResolver, TableProbe};
pub use scheduler::{Registrar, ScheduledTaskDescriptor, TaskScheduler};
pub use supervisor::{Supervisor, TickOutcome};
