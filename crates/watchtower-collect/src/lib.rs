//! Collection engine
//!
//! Ingestion of adapter snapshots, transcript tailing, and the scheduler
//! that drives every collector on its cadence with retries.

pub mod cadence;
pub mod ingest;
pub mod ledger;
pub mod retry;
pub mod scheduler;
pub mod tailer;
pub mod tasks;

pub use cadence::{Cadence, CadenceKind};
pub use ingest::IngestReport;
pub use ledger::CollectorLedger;
pub use retry::{RetryPolicy, RetryStep};
pub use scheduler::{run_cycle, CollectorTask, CycleOutcome, Scheduler};
pub use tasks::{collector_tasks, TASK_NAMES};
