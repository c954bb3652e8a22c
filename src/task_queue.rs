use crate::task::ManagedTaskInternal;

use std::collections::VecDeque;
use std::fmt;

/// The FIFO backlog of tasks that were submitted while every slot was busy.
///
/// The queue itself is not synchronized; it lives inside the pool state and is
/// only touched while the pool lock is held, together with the in-flight count.
#[derive(Default)]
pub(crate) struct TaskQueue {
  pending: VecDeque<ManagedTaskInternal>,
}

impl fmt::Debug for TaskQueue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TaskQueue")
      .field("len", &self.pending.len())
      .field("head_task_id", &self.pending.front().map(|task| task.task_id))
      .finish()
  }
}

impl TaskQueue {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  /// Appends a task at the tail.
  pub(crate) fn push(&mut self, task: ManagedTaskInternal) {
    self.pending.push_back(task);
  }

  /// Takes the oldest pending task, if any.
  pub(crate) fn pop(&mut self) -> Option<ManagedTaskInternal> {
    self.pending.pop_front()
  }

  /// Removes every pending task, oldest first.
  pub(crate) fn drain(&mut self) -> Vec<ManagedTaskInternal> {
    self.pending.drain(..).collect()
  }

  pub(crate) fn len(&self) -> usize {
    self.pending.len()
  }
}
