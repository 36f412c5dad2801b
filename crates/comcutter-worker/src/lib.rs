//! Commercial cutting worker.
//!
//! This crate provides:
//! - The per-job backup, run, verify, commit-or-restore protocol
//! - The best-effort post-process hook
//! - A fixed-size pool of workers draining the shared job queue

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod pool;
pub mod postprocess;

pub use config::WorkerConfig;
pub use error::{JobError, JobResult};
pub use executor::{Committed, JobExecutor};
pub use logging::JobLogger;
pub use pool::{JobHandler, WorkerPool};
pub use postprocess::{PostProcess, PostProcessor};
