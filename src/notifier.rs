use crate::task::TaskOutcome;

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;
use tracing::{debug, error, info, trace};

// --- Public Event Structs for Handlers ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskCompletionStatus {
  Success,
  /// The task returned an error.
  Failed,
  /// The task panicked. Counted as a failure.
  Panicked,
  /// The task never finished because the runtime dropped it. Counted as a failure.
  Abandoned,
}

impl From<TaskOutcome> for TaskCompletionStatus {
  fn from(outcome: TaskOutcome) -> Self {
    match outcome {
      TaskOutcome::Succeeded => TaskCompletionStatus::Success,
      TaskOutcome::Failed => TaskCompletionStatus::Failed,
      TaskOutcome::Panicked => TaskCompletionStatus::Panicked,
      TaskOutcome::Abandoned => TaskCompletionStatus::Abandoned,
    }
  }
}

#[derive(Debug, Clone)]
pub struct TaskCompletionInfo {
  pub task_id: u64,
  pub pool_name: Arc<String>,
  pub status: TaskCompletionStatus,
  pub completion_time: SystemTime,
}

type CompletionHandler = Arc<dyn Fn(TaskCompletionInfo) + Send + Sync + 'static>;

/// Fans completion events out to the registered handlers.
///
/// Handlers run on the slot runner that finished the task, after the pool
/// counters were updated and outside the pool lock.
pub(crate) struct CompletionNotifier {
  pool_name: Arc<String>,
  handlers: RwLock<Vec<CompletionHandler>>,
}

impl fmt::Debug for CompletionNotifier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let handler_count = self.handlers.try_read().map_or(0, |guard| guard.len());
    f.debug_struct("CompletionNotifier")
      .field("pool_name", &self.pool_name)
      .field("handler_count", &handler_count)
      .finish()
  }
}

impl CompletionNotifier {
  pub(crate) fn new(pool_name: Arc<String>) -> Self {
    Self {
      pool_name,
      handlers: RwLock::new(Vec::new()),
    }
  }

  pub(crate) fn add_handler(&self, handler: impl Fn(TaskCompletionInfo) + Send + Sync + 'static) {
    let mut handlers_guard = self.handlers.write();
    handlers_guard.push(Arc::new(handler));
    info!(pool_name = %*self.pool_name, "Notifier: Added new completion handler. Total handlers: {}", handlers_guard.len());
  }

  pub(crate) fn notify(&self, task_id: u64, outcome: TaskOutcome) {
    // Snapshot so a handler may register further handlers without deadlocking.
    let handlers: Vec<CompletionHandler> = self.handlers.read().clone();
    if handlers.is_empty() {
      trace!(pool_name = %*self.pool_name, %task_id, "No completion handlers registered, dropping notification.");
      return;
    }

    let info = TaskCompletionInfo {
      task_id,
      pool_name: self.pool_name.clone(),
      status: outcome.into(),
      completion_time: SystemTime::now(),
    };

    debug!(pool_name = %*self.pool_name, %task_id, "Dispatching notification to {} handlers.", handlers.len());

    for handler in handlers {
      let info_for_handler = info.clone();
      if catch_unwind(AssertUnwindSafe(|| handler(info_for_handler))).is_err() {
        error!(
          pool_name = %*self.pool_name,
          %task_id,
          "A completion handler panicked during execution."
        );
      }
    }
  }
}
