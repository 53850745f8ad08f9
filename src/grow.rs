//! Heap growth.

use log::{debug, warn};

use crate::{
  align::checked_align_to,
  arena::Arena,
  block::WORD,
  config::HeapConfig,
  error::HeapError,
  heap::{Heap, HeapPtr},
};

impl<A: Arena> Heap<A> {
  /// Grows the arena by at least `min_bytes` and adds the new space as one
  /// free block, merged with the previous topmost block if that was free.
  ///
  /// The new block's header occupies the last word of the previous region,
  /// so the region grown is exactly the block size. Growth past
  /// [`HeapConfig::MAX_ARENA_BYTES`] is refused, which bounds every merge.
  pub(crate) fn extend(
    &mut self,
    min_bytes: usize,
  ) -> Result<HeapPtr, HeapError> {
    let size = checked_align_to(min_bytes, self.config.alignment)
      .filter(|&size| {
        self
          .arena
          .len()
          .checked_add(size)
          .is_some_and(|end| end <= HeapConfig::MAX_ARENA_BYTES)
      })
      .ok_or(HeapError::OutOfMemory { requested: min_bytes })?;

    let base = self.arena.grow(size).inspect_err(|err| {
      warn!("heap growth by {size} bytes failed: {err}");
    })?;

    let bt = base - WORD;
    self.make_tags(bt, size, false);
    self.last = bt;
    debug!("heap grown by {size} bytes: new block at {bt:#x}");

    Ok(self.coalesce(bt))
  }
}
