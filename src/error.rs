//! Error type for the strict operations of [IndexedPQ](crate::IndexedPQ).
//! Operations where "not there" is an ordinary outcome return `Option` or
//! `bool` instead and never produce one of these.

use thiserror::Error;

/// Result type alias using QueueError.
pub type Result<T> = core::result::Result<T, QueueError>;

/// Failures of the indexed priority queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
  #[error("Priority queue is empty")]
  QueueEmpty,

  #[error("Key index {ki} already present in queue")]
  DuplicateKey { ki: usize },

  #[error("Key index {ki} out of bounds (capacity {capacity})")]
  KeyOutOfBounds { ki: usize, capacity: usize },

  #[error("Key index {ki} not present in queue")]
  KeyNotFound { ki: usize },
}
