use std::future::Future;
use std::pin::Pin;

/// The outcome of a single task as seen by the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskOutcome {
  Succeeded,
  Failed,
  Panicked,
  /// The runner was dropped before the task could finish, e.g. because the
  /// runtime shut down. Counted as a failure.
  Abandoned,
}

impl TaskOutcome {
  pub(crate) fn is_success(self) -> bool {
    matches!(self, TaskOutcome::Succeeded)
  }
}

/// The type of future that the pool executes once a task has been normalized.
/// User errors are already logged and folded into a `TaskOutcome` at this point.
pub(crate) type TaskToExecute = Pin<Box<dyn Future<Output = TaskOutcome> + Send + 'static>>;

/// Internal representation of a task owned by the pool between submission and completion.
pub(crate) struct ManagedTaskInternal {
  pub(crate) task_id: u64,
  pub(crate) future: TaskToExecute,
}
