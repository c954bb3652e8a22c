use puddle::BoundedPool;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::info;

async fn my_task_fn(id: usize, delay_ms: u64) -> Result<(), String> {
  info!("Task {} starting, will sleep for {}ms", id, delay_ms);
  tokio::time::sleep(Duration::from_millis(delay_ms)).await;
  info!("Task {} finished successfully after {}ms", id, delay_ms);
  Ok(())
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();

  info!("--- Basic Usage Example ---");

  let pool = BoundedPool::new(2, Handle::current(), "basic_pool").expect("capacity is non-zero");

  for i in 0..5 {
    // Alternate sleep times for variety
    let sleep_duration: u64 = 500 + (i as u64 % 3 * 250);
    let task_id = pool.submit(my_task_fn(i, sleep_duration));
    info!("Submitted task {} as pool task id {}", i, task_id);
  }

  info!(
    "All tasks submitted. Running: {}, queued: {}. Waiting...",
    pool.running_workers(),
    pool.queued_tasks()
  );
  pool.wait().await;

  info!(
    "Done: {} succeeded, {} failed. Pool idle: {}",
    pool.successful_tasks(),
    pool.failed_tasks(),
    pool.is_done()
  );
  info!("--- Basic Usage Example End ---");
}
