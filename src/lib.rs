//! A Tokio-based bounded-concurrency task runner.
//!
//! At most `capacity` submitted tasks run at once; the rest wait in a FIFO
//! backlog and are started as slots free up. Outcomes are aggregated into
//! success and failure counters, and [`BoundedPool::wait`] resolves once all
//! submitted and queued work has finished.

mod barrier;
mod error;
mod notifier;
mod pool;
mod task;
mod task_queue;

pub use error::PoolError;
pub use notifier::{TaskCompletionInfo, TaskCompletionStatus};
pub use pool::{BoundedPool, PoolStats};
