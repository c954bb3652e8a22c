use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

/// Counts outstanding task registrations and wakes waiters when the count
/// drops to zero.
///
/// Every launched task performs exactly one `register` followed later by
/// exactly one `resolve`. A task chained from the backlog registers itself
/// before its predecessor resolves, so the count never touches zero while
/// chained work is pending.
#[derive(Debug, Default)]
pub(crate) struct CompletionBarrier {
  outstanding: AtomicUsize,
  zero_reached: Notify,
}

impl CompletionBarrier {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  pub(crate) fn register(&self) {
    self.outstanding.fetch_add(1, Ordering::SeqCst);
  }

  pub(crate) fn resolve(&self) {
    let previous = self.outstanding.fetch_sub(1, Ordering::SeqCst);
    debug_assert!(previous > 0, "resolve called without a matching register");
    if previous == 1 {
      self.zero_reached.notify_waiters();
    }
  }

  pub(crate) fn outstanding(&self) -> usize {
    self.outstanding.load(Ordering::SeqCst)
  }

  /// Resolves once the live outstanding count is observed at zero.
  ///
  /// Registrations made while waiting extend the wait; nothing is snapshotted.
  pub(crate) async fn wait(&self) {
    loop {
      let notified = self.zero_reached.notified();
      tokio::pin!(notified);
      // Enable before checking so a resolve between the check and the await is not missed.
      notified.as_mut().enable();

      if self.outstanding() == 0 {
        return;
      }
      notified.await;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;
  use std::time::Duration;

  #[tokio::test]
  async fn test_wait_returns_immediately_when_nothing_registered() {
    let barrier = CompletionBarrier::new();
    tokio::time::timeout(Duration::from_millis(50), barrier.wait())
      .await
      .expect("wait on an idle barrier should not block");
  }

  #[tokio::test]
  async fn test_wait_blocks_until_last_resolve() {
    let barrier = Arc::new(CompletionBarrier::new());
    barrier.register();
    barrier.register();

    let waiter = {
      let barrier = barrier.clone();
      tokio::spawn(async move { barrier.wait().await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    barrier.resolve();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished(), "one registration is still outstanding");

    barrier.resolve();
    tokio::time::timeout(Duration::from_millis(100), waiter)
      .await
      .expect("waiter should wake once the count reaches zero")
      .unwrap();
    assert_eq!(barrier.outstanding(), 0);
  }

  #[tokio::test]
  async fn test_register_before_resolve_keeps_waiter_parked() {
    let barrier = Arc::new(CompletionBarrier::new());
    barrier.register();

    let waiter = {
      let barrier = barrier.clone();
      tokio::spawn(async move { barrier.wait().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Hand the slot over to a chained successor.
    barrier.register();
    barrier.resolve();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished(), "successor registration must keep the barrier open");
    assert_eq!(barrier.outstanding(), 1);

    barrier.resolve();
    tokio::time::timeout(Duration::from_millis(100), waiter)
      .await
      .expect("waiter should wake after the successor resolves")
      .unwrap();
  }

  #[test]
  fn test_wait_from_blocking_executor() {
    let barrier = CompletionBarrier::new();
    barrier.register();
    barrier.resolve();
    futures::executor::block_on(barrier.wait());
    assert_eq!(barrier.outstanding(), 0);
  }
}
