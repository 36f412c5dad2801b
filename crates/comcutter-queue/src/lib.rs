//! In-memory job coordination.
//!
//! This crate provides:
//! - Library path resolution for caller-supplied media paths
//! - The in-flight set used to reject duplicate submissions
//! - An unbounded FIFO shared by a pool of workers
//! - The `Dispatcher` that ties the three together behind `submit`

pub mod dispatcher;
pub mod error;
pub mod inflight;
pub mod path;
pub mod queue;

pub use dispatcher::Dispatcher;
pub use error::{QueueError, QueueResult, SubmitError};
pub use inflight::InFlightSet;
pub use path::resolve_media_path;
pub use queue::{job_queue, JobReceiver, JobSender};
