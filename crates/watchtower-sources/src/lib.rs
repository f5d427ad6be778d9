//! Read-only probes of the observed agent runtime
//!
//! Every adapter depends only on the [`CommandRunner`] and [`FileSource`]
//! primitives, so tests can drive them with the doubles in [`fake`].

pub mod base;
pub mod cron;
pub mod fake;
pub mod fs;
pub mod memory;
pub mod probe;
pub mod registry;
pub mod sessions;
pub mod status;

pub use base::SourceAdapter;
pub use cron::CronAdapter;
pub use fs::{FileSource, LocalFs};
pub use memory::MemoryAdapter;
pub use probe::{CommandOutput, CommandRunner, TokioCommandRunner};
pub use registry::SourceSet;
pub use sessions::SessionsAdapter;
pub use status::StatusAdapter;
