use std::time::Duration;

use thiserror::Error;

/// Errors that can occur within the `puddle` pool.
///
/// Task failures are not errors of the pool; they are only counted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
  #[error("Pool capacity must be at least 1")]
  ZeroCapacity,

  #[error("Outstanding tasks did not finish within {0:?}")]
  WaitTimedOut(Duration),
}
