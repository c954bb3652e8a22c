use puddle::BoundedPool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tracing::info;

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();

  info!("--- Concurrency Limit Example (Limit: 2) ---");

  let concurrency_limit = 2;
  let pool = BoundedPool::new(concurrency_limit, Handle::current(), "concurrency_pool").expect("capacity is non-zero");

  let num_tasks = 5;
  let max_seen = Arc::new(AtomicUsize::new(0));
  let current = Arc::new(AtomicUsize::new(0));
  let start = Instant::now();

  info!(
    "Submitting {} tasks, each takes 1 sec. With concurrency {}, this should take ~{} secs.",
    num_tasks,
    concurrency_limit,
    (num_tasks as f32 / concurrency_limit as f32).ceil()
  );

  for i in 0..num_tasks {
    let current = current.clone();
    let max_seen = max_seen.clone();
    pool.submit(async move {
      let now = current.fetch_add(1, Ordering::SeqCst) + 1;
      max_seen.fetch_max(now, Ordering::SeqCst);
      info!("[{:>5}ms] Task {} starting (concurrent: {})", start.elapsed().as_millis(), i, now);
      tokio::time::sleep(Duration::from_secs(1)).await;
      current.fetch_sub(1, Ordering::SeqCst);
      Ok::<(), String>(())
    });
  }

  pool.wait().await;

  info!(
    "All tasks processed in {:?}. Peak concurrency: {}. Stats: {:?}",
    start.elapsed(),
    max_seen.load(Ordering::SeqCst),
    pool.stats()
  );
  info!("--- Concurrency Limit Example End ---");
}
