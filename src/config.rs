//! Heap layout parameters.

use crate::{block::WORD, error::HeapError};

/// Layout parameters for a [`Heap`](crate::Heap).
///
/// Both values are fixed for the lifetime of a heap. Every block size is a
/// multiple of `alignment`, and no block is ever smaller than
/// `min_block_size`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeapConfig {
  /// Alignment unit for payload offsets and block sizes, in bytes.
  ///
  /// Must be a power of two and at least two words.
  pub alignment: usize,

  /// Smallest block the heap will create, in bytes.
  ///
  /// Must be a multiple of `alignment` and large enough for a header, the two
  /// free-list links and a footer. This is also the split threshold: a
  /// leftover smaller than this stays inside the block as slack.
  pub min_block_size: usize,
}

impl HeapConfig {
  /// Default alignment unit.
  pub const DEFAULT_ALIGNMENT: usize = 16;

  /// Default minimum block size: header + next + prev + footer.
  pub const DEFAULT_MIN_BLOCK_SIZE: usize = 4 * WORD;

  /// Bytes of metadata carried by every block (header and footer).
  pub const OVERHEAD: usize = 2 * WORD;

  /// Largest arena a heap will grow to.
  ///
  /// No block can be larger than the arena, so every size fits a 32-bit tag
  /// and every link distance fits a signed 32-bit word count.
  pub const MAX_ARENA_BYTES: usize = u32::MAX as usize;

  /// Checks the constraints documented on each field.
  pub fn validate(&self) -> Result<(), HeapError> {
    if !self.alignment.is_power_of_two() || self.alignment < 2 * WORD {
      return Err(HeapError::InvalidConfig {
        reason: "alignment must be a power of two of at least two words",
      });
    }
    if self.min_block_size < 4 * WORD {
      return Err(HeapError::InvalidConfig {
        reason: "minimum block size must hold a header, two links and a footer",
      });
    }
    if self.min_block_size % self.alignment != 0 {
      return Err(HeapError::InvalidConfig {
        reason: "minimum block size must be a multiple of the alignment",
      });
    }
    if u32::try_from(self.min_block_size).is_err() {
      return Err(HeapError::InvalidConfig {
        reason: "minimum block size does not fit in a boundary tag",
      });
    }
    Ok(())
  }

  /// Largest request served by a minimum-sized block.
  pub fn small_payload(&self) -> usize {
    self.min_block_size - Self::OVERHEAD
  }

  /// Block size needed to hold `size` payload bytes.
  ///
  /// Returns `None` when the rounded size cannot be represented.
  pub fn block_size_for(
    &self,
    size: usize,
  ) -> Option<usize> {
    if size <= self.small_payload() {
      return Some(self.min_block_size);
    }
    crate::align::checked_align_to(size.checked_add(Self::OVERHEAD)?, self.alignment)
  }

  /// Bytes grown once at start-up for the head and tail sentinels.
  pub(crate) fn prologue_bytes(&self) -> usize {
    self.alignment + 2 * self.min_block_size
  }
}

impl Default for HeapConfig {
  fn default() -> Self {
    Self {
      alignment: Self::DEFAULT_ALIGNMENT,
      min_block_size: Self::DEFAULT_MIN_BLOCK_SIZE,
    }
  }
}
