use crate::barrier::CompletionBarrier;
use crate::error::PoolError;
use crate::notifier::{CompletionNotifier, TaskCompletionInfo};
use crate::task::{ManagedTaskInternal, TaskOutcome, TaskToExecute};
use crate::task_queue::TaskQueue;

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::runtime::Handle as TokioHandle;
use tracing::{debug, error, info, info_span, trace, warn, Instrument};

lazy_static::lazy_static! {
  static ref NEXT_POOL_TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(0);
}

/// A point-in-time view of the pool counters, taken under a single lock acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
  pub capacity: u64,
  pub running: u64,
  pub queued: u64,
  pub finished: u64,
  pub succeeded: u64,
  pub failed: u64,
}

/// Everything the admission gate and the completion handler mutate.
/// Only ever touched with the pool lock held.
struct PoolState {
  in_flight: u64,
  backlog: TaskQueue,
  finished: u64,
  succeeded: u64,
  failed: u64,
}

impl PoolState {
  fn new() -> Self {
    Self {
      in_flight: 0,
      backlog: TaskQueue::new(),
      finished: 0,
      succeeded: 0,
      failed: 0,
    }
  }
}

/// Runs at most `capacity` tasks at once on a Tokio runtime and queues the rest.
///
/// Cloning is cheap; all clones share the same counters, backlog and barrier.
#[derive(Clone)]
pub struct BoundedPool {
  pool_name: Arc<String>,
  capacity: u64,
  state: Arc<Mutex<PoolState>>,
  barrier: Arc<CompletionBarrier>,
  notifier: Arc<CompletionNotifier>,
  tokio_handle: TokioHandle,
}

impl fmt::Debug for BoundedPool {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BoundedPool")
      .field("pool_name", &self.pool_name)
      .field("stats", &self.stats())
      .field("outstanding", &self.barrier.outstanding())
      .finish_non_exhaustive()
  }
}

impl BoundedPool {
  /// Creates a pool that runs at most `capacity` tasks concurrently on `tokio_handle`.
  ///
  /// # Errors
  /// Returns `PoolError::ZeroCapacity` if `capacity` is 0, since such a pool could
  /// never drain its backlog.
  pub fn new(capacity: usize, tokio_handle: TokioHandle, pool_name: &str) -> Result<Self, PoolError> {
    if capacity == 0 {
      error!(pool_name = %pool_name, "Refusing to build a pool with zero capacity.");
      return Err(PoolError::ZeroCapacity);
    }

    let pool_name = Arc::new(pool_name.to_string());
    info!(pool_name = %*pool_name, capacity, "Bounded pool created.");

    Ok(Self {
      notifier: Arc::new(CompletionNotifier::new(pool_name.clone())),
      pool_name,
      capacity: capacity as u64,
      state: Arc::new(Mutex::new(PoolState::new())),
      barrier: Arc::new(CompletionBarrier::new()),
      tokio_handle,
    })
  }

  pub fn name(&self) -> &str {
    &self.pool_name
  }

  pub fn capacity(&self) -> u64 {
    self.capacity
  }

  /// Submits a future. It starts immediately if a slot is free, otherwise it is
  /// appended to the backlog. Never blocks; returns the task id.
  ///
  /// An `Err` outcome is logged and counted as a failure. A panic inside the
  /// future is caught and counted as a failure as well.
  pub fn submit<Fut, E>(&self, task: Fut) -> u64
  where
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: fmt::Debug + Send + 'static,
  {
    let task_id = NEXT_POOL_TASK_ID_COUNTER.fetch_add(1, AtomicOrdering::Relaxed);
    let pool_name = self.pool_name.clone();

    let future: TaskToExecute = Box::pin(async move {
      match AssertUnwindSafe(task).catch_unwind().await {
        Ok(result) => classify_result(&pool_name, task_id, result),
        Err(_panic_payload) => {
          error!(pool_name = %*pool_name, %task_id, "Task panicked during execution.");
          TaskOutcome::Panicked
        }
      }
    });

    self.admit(ManagedTaskInternal { task_id, future });
    task_id
  }

  /// Submits a blocking closure. While it runs on Tokio's blocking thread pool it
  /// occupies one of this pool's slots exactly like a future would.
  pub fn submit_blocking<F, E>(&self, task: F) -> u64
  where
    F: FnOnce() -> Result<(), E> + Send + 'static,
    E: fmt::Debug + Send + 'static,
  {
    let task_id = NEXT_POOL_TASK_ID_COUNTER.fetch_add(1, AtomicOrdering::Relaxed);
    let pool_name = self.pool_name.clone();

    let future: TaskToExecute = Box::pin(async move {
      match tokio::task::spawn_blocking(task).await {
        Ok(result) => classify_result(&pool_name, task_id, result),
        Err(join_error) if join_error.is_panic() => {
          error!(pool_name = %*pool_name, %task_id, "Blocking task panicked during execution.");
          TaskOutcome::Panicked
        }
        Err(join_error) => {
          error!(pool_name = %*pool_name, %task_id, "Blocking task could not be joined: {:?}", join_error);
          TaskOutcome::Failed
        }
      }
    });

    self.admit(ManagedTaskInternal { task_id, future });
    task_id
  }

  /// Waits until every submitted task, including everything chained from the
  /// backlog, has completed. Work submitted while waiting is waited for too.
  pub async fn wait(&self) {
    self.barrier.wait().await;
    trace!(pool_name = %*self.pool_name, "Wait: no outstanding tasks.");
  }

  /// Like [`wait`](Self::wait) but gives up after `timeout`.
  ///
  /// # Errors
  /// Returns `PoolError::WaitTimedOut` if work was still outstanding at the deadline.
  /// The outstanding tasks keep running.
  pub async fn wait_timeout(&self, timeout: Duration) -> Result<(), PoolError> {
    match tokio::time::timeout(timeout, self.wait()).await {
      Ok(()) => Ok(()),
      Err(_elapsed) => {
        warn!(
          pool_name = %*self.pool_name,
          outstanding = self.barrier.outstanding(),
          "Wait: deadline of {:?} elapsed with work outstanding.",
          timeout
        );
        Err(PoolError::WaitTimedOut(timeout))
      }
    }
  }

  /// Blocks the calling thread until the pool is quiescent.
  ///
  /// Must not be called from a thread that is driving the pool's runtime; use
  /// [`wait`](Self::wait) from async code.
  pub fn wait_blocking(&self) {
    futures::executor::block_on(self.wait());
  }

  /// Whether no task is running at this instant. Racy with concurrent submissions.
  pub fn is_done(&self) -> bool {
    self.state.lock().in_flight == 0
  }

  pub fn running_workers(&self) -> u64 {
    self.state.lock().in_flight
  }

  pub fn successful_tasks(&self) -> u64 {
    self.state.lock().succeeded
  }

  pub fn failed_tasks(&self) -> u64 {
    self.state.lock().failed
  }

  pub fn finished_tasks(&self) -> u64 {
    self.state.lock().finished
  }

  /// Number of tasks waiting in the backlog for a free slot.
  pub fn queued_tasks(&self) -> u64 {
    self.state.lock().backlog.len() as u64
  }

  pub fn stats(&self) -> PoolStats {
    let state = self.state.lock();
    PoolStats {
      capacity: self.capacity,
      running: state.in_flight,
      queued: state.backlog.len() as u64,
      finished: state.finished,
      succeeded: state.succeeded,
      failed: state.failed,
    }
  }

  /// Registers a callback invoked once for every task that finishes from now on.
  ///
  /// Handlers run inline on the slot that finished the task, before that task is
  /// released to [`wait`](Self::wait). They must be quick and must not block: while
  /// a handler runs, its slot stays occupied and the backlog does not advance.
  pub fn add_completion_handler(&self, handler: impl Fn(TaskCompletionInfo) + Send + Sync + 'static) {
    self.notifier.add_handler(handler);
  }

  /// The admission gate. The capacity check, the in-flight increment, the barrier
  /// registration and the enqueue all happen in one critical section.
  fn admit(&self, task: ManagedTaskInternal) {
    let task_to_launch = {
      let mut state = self.state.lock();
      if state.in_flight < self.capacity {
        state.in_flight += 1;
        self.barrier.register();
        Some(task)
      } else {
        debug!(
          pool_name = %*self.pool_name,
          task_id = task.task_id,
          queued = state.backlog.len() + 1,
          "All slots busy, task queued."
        );
        state.backlog.push(task);
        None
      }
    };

    if let Some(task) = task_to_launch {
      debug!(pool_name = %*self.pool_name, task_id = task.task_id, "Slot free, launching task.");
      self.launch(task);
    }
  }

  fn launch(&self, task: ManagedTaskInternal) {
    let runner = SlotRunner::new(self, task.task_id);
    // If the runtime is gone the future is dropped right away and the runner's
    // `Drop` gives the slot back.
    self.tokio_handle.spawn(
      runner
        .run(task)
        .instrument(info_span!("slot_runner", pool_name = %*self.pool_name)),
    );
  }
}

fn classify_result<E: fmt::Debug>(pool_name: &str, task_id: u64, result: Result<(), E>) -> TaskOutcome {
  match result {
    Ok(()) => {
      trace!(pool_name = %pool_name, %task_id, "Task executed successfully.");
      TaskOutcome::Succeeded
    }
    Err(task_error) => {
      warn!(pool_name = %pool_name, %task_id, "Task failed: {:?}", task_error);
      TaskOutcome::Failed
    }
  }
}

/// Owns one slot. Runs a task, records it, and keeps pulling from the backlog
/// until the backlog is empty, at which point the slot is released.
///
/// `active_task` is the task whose slot and barrier registration this runner
/// currently holds. If the runner is dropped while it is set, `Drop` settles it.
struct SlotRunner {
  pool_name: Arc<String>,
  state: Arc<Mutex<PoolState>>,
  barrier: Arc<CompletionBarrier>,
  notifier: Arc<CompletionNotifier>,
  active_task: Option<u64>,
}

impl SlotRunner {
  fn new(pool: &BoundedPool, task_id: u64) -> Self {
    Self {
      pool_name: pool.pool_name.clone(),
      state: pool.state.clone(),
      barrier: pool.barrier.clone(),
      notifier: pool.notifier.clone(),
      active_task: Some(task_id),
    }
  }

  async fn run(mut self, first_task: ManagedTaskInternal) {
    let mut current = first_task;
    loop {
      let task_id = current.task_id;
      let outcome = current.future.await;

      let next = self.complete(task_id, outcome);
      self.notifier.notify(task_id, outcome);
      // The successor (if any) is already registered, so this cannot open the barrier early.
      self.barrier.resolve();
      self.active_task = next.as_ref().map(|task| task.task_id);

      match next {
        Some(task) => current = task,
        None => break,
      }
    }
  }

  /// Records the outcome, frees the slot and, if work is queued, hands the slot
  /// to the backlog head. One critical section.
  fn complete(&self, task_id: u64, outcome: TaskOutcome) -> Option<ManagedTaskInternal> {
    let mut state = self.state.lock();

    if outcome.is_success() {
      state.succeeded += 1;
    } else {
      state.failed += 1;
    }
    state.finished += 1;
    state.in_flight -= 1;

    let next = state.backlog.pop();
    if let Some(task) = &next {
      state.in_flight += 1;
      self.barrier.register();
      debug!(
        pool_name = %*self.pool_name,
        finished_task_id = %task_id,
        next_task_id = task.task_id,
        remaining = state.backlog.len(),
        "Slot handed to queued task."
      );
    } else {
      trace!(pool_name = %*self.pool_name, %task_id, running = state.in_flight, "Slot released.");
    }
    next
  }
}

impl Drop for SlotRunner {
  fn drop(&mut self) {
    let Some(task_id) = self.active_task.take() else {
      return;
    };

    // Only a runtime shutdown drops a runner mid-task. Nothing can run the
    // backlog on this pool's handle anymore, so it is settled here as well.
    let stranded = {
      let mut state = self.state.lock();
      let stranded = state.backlog.drain();
      let abandoned = 1 + stranded.len() as u64;
      state.failed += abandoned;
      state.finished += abandoned;
      state.in_flight -= 1;
      stranded
    };

    error!(
      pool_name = %*self.pool_name,
      %task_id,
      stranded = stranded.len(),
      "Slot runner dropped before its task finished. Task and backlog counted as abandoned."
    );

    self.notifier.notify(task_id, TaskOutcome::Abandoned);
    for task in &stranded {
      self.notifier.notify(task.task_id, TaskOutcome::Abandoned);
    }
    // Queued futures are dropped outside the pool lock.
    drop(stranded);
    self.barrier.resolve();
  }
}
