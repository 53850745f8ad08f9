//! Heap error types.

use thiserror::Error;

/// Errors reported by the heap and its arenas.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum HeapError {
  /// The arena could not supply enough memory for the request.
  ///
  /// The heap is left fully consistent; the caller may retry with a smaller
  /// request or after releasing other blocks.
  #[error("out of memory: requested {requested} bytes")]
  OutOfMemory {
    /// Number of bytes that could not be obtained.
    requested: usize,
  },

  /// A [`HeapConfig`](crate::HeapConfig) failed validation.
  #[error("invalid heap configuration: {reason}")]
  InvalidConfig {
    /// Which constraint was violated.
    reason: &'static str,
  },

  /// The consistency check found broken block metadata.
  #[error("heap corrupted at offset {offset:#x}: {reason}")]
  Corrupted {
    /// Arena offset of the offending boundary tag.
    offset: usize,
    /// Which invariant does not hold.
    reason: &'static str,
  },
}
