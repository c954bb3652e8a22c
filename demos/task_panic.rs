use puddle::BoundedPool;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::info;

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();
  info!("--- Task Panic Example ---");

  let pool = BoundedPool::new(1, Handle::current(), "panic_pool").expect("capacity is non-zero");

  let task_id = pool.submit(async {
    info!("Panicking Task: Starting...");
    tokio::time::sleep(Duration::from_millis(100)).await;
    info!("Panicking Task: About to panic!");
    panic!("This task is designed to panic!");
    #[allow(unreachable_code)]
    Ok::<(), String>(())
  });
  info!("Panicking task {} submitted.", task_id);

  // Queued behind the panicking task; it still gets the slot afterwards.
  pool.submit(async {
    info!("Follow-up Task: running after the panic.");
    Ok::<(), String>(())
  });

  pool.wait().await;

  info!(
    "Pool survived the panic: {} succeeded, {} failed.",
    pool.successful_tasks(),
    pool.failed_tasks()
  );
  info!("--- Task Panic Example End ---");
}
