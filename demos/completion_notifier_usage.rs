use puddle::{BoundedPool, TaskCompletionInfo, TaskCompletionStatus};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::info;

// Dummy task function
async fn my_notified_task(id: usize, delay_ms: u64, should_fail: bool) -> Result<(), String> {
  info!("NotifiedTask {}: Starting, will sleep for {}ms. Fail: {}", id, delay_ms, should_fail);
  tokio::time::sleep(Duration::from_millis(delay_ms)).await;
  if should_fail {
    return Err(format!("NotifiedTask {} failed", id));
  }
  info!("NotifiedTask {} finished successfully after {}ms", id, delay_ms);
  Ok(())
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::INFO)
    .with_target(false)
    .init();

  info!("--- Completion Notifier Example ---");

  let pool = BoundedPool::new(2, Handle::current(), "notifier_example_pool").expect("capacity is non-zero");

  let successful_tasks_count = Arc::new(AtomicUsize::new(0));
  let failed_tasks_count = Arc::new(AtomicUsize::new(0));

  // Handler 1: Simple logger
  pool.add_completion_handler(|info: TaskCompletionInfo| {
    info!(
      "[Handler 1 - Logger] Task {} (Pool: {}) completed. Status: {:?}, Time: {:?}",
      info.task_id, info.pool_name, info.status, info.completion_time
    );
  });

  // Handler 2: Counter
  let s_clone = successful_tasks_count.clone();
  let f_clone = failed_tasks_count.clone();
  pool.add_completion_handler(move |info: TaskCompletionInfo| match info.status {
    TaskCompletionStatus::Success => {
      s_clone.fetch_add(1, Ordering::Relaxed);
    }
    TaskCompletionStatus::Failed | TaskCompletionStatus::Panicked | TaskCompletionStatus::Abandoned => {
      f_clone.fetch_add(1, Ordering::Relaxed);
    }
  });

  for i in 0..6 {
    pool.submit(my_notified_task(i, 100 + (i as u64 * 50), i % 4 == 3));
  }

  pool.wait().await;

  info!(
    "Handlers counted {} successes and {} failures; pool reports {} and {}.",
    successful_tasks_count.load(Ordering::Relaxed),
    failed_tasks_count.load(Ordering::Relaxed),
    pool.successful_tasks(),
    pool.failed_tasks()
  );
  info!("--- Completion Notifier Example End ---");
}
