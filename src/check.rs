//! Heap consistency checking.
//!
//! [`Heap::check_heap`] is a diagnostic, not part of any allocation path. It
//! walks the arena twice, once by address and once along the free list, and
//! reports the first broken invariant it finds.

use std::collections::HashSet;

use log::debug;

use crate::{
  arena::Arena,
  block::{Tag, WORD},
  error::HeapError,
  heap::Heap,
};

/// Summary of a heap that passed [`Heap::check_heap`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapReport {
  /// Real blocks, sentinels excluded.
  pub blocks: usize,
  pub free_blocks: usize,
  pub free_bytes: usize,
  pub used_bytes: usize,
  /// Total arena size, prologue included.
  pub arena_bytes: usize,
}

fn corrupted(
  offset: usize,
  reason: &'static str,
) -> HeapError {
  HeapError::Corrupted { offset, reason }
}

impl<A: Arena> Heap<A> {
  /// Verifies the block layout and the free list.
  ///
  /// Checks that every header matches its footer, that no two free blocks are
  /// adjacent, that the free list holds exactly the free blocks with
  /// consistent back links, and that the topmost pointer names the last block
  /// in the arena. With `verbose`, every block is logged at debug level.
  pub fn check_heap(
    &self,
    verbose: bool,
  ) -> Result<HeapReport, HeapError> {
    let arena_bytes = self.arena.len();
    let mut report = HeapReport {
      arena_bytes,
      ..HeapReport::default()
    };

    self.check_sentinel(self.head)?;
    self.check_sentinel(self.tail)?;

    let mut free = HashSet::new();
    let mut prev_free = false;
    let mut end = self.tail + self.config.min_block_size;
    let mut current = self.next_block(self.tail);

    while let Some(bt) = current {
      if bt != end {
        return Err(corrupted(bt, "topmost pointer does not match the block chain"));
      }
      let tag = self.checked_tag(bt)?;
      let size = tag.size();

      if size < self.config.min_block_size || size % self.config.alignment != 0 {
        return Err(corrupted(bt, "block size is not a valid size class"));
      }
      if bt + size + WORD > arena_bytes {
        return Err(corrupted(bt, "block extends past the arena"));
      }
      if self.tag(bt + size - WORD) != tag {
        return Err(corrupted(bt, "header and footer disagree"));
      }
      if tag.is_free() && prev_free {
        return Err(corrupted(bt, "adjacent free blocks"));
      }

      if verbose {
        debug!(
          "{bt:#x}: {size} bytes {}",
          if tag.in_use() { "used" } else { "free" }
        );
      }

      report.blocks += 1;
      if tag.is_free() {
        free.insert(bt);
        report.free_bytes += size;
      } else {
        report.used_bytes += size;
      }

      prev_free = tag.is_free();
      end = bt + size;
      current = self.next_block(bt);
    }

    if end + WORD != arena_bytes {
      return Err(corrupted(self.last, "topmost block does not end the arena"));
    }
    report.free_blocks = free.len();

    self.check_free_list(&free)?;

    if verbose {
      debug!("{report:?}");
    }

    Ok(report)
  }

  fn checked_tag(
    &self,
    bt: usize,
  ) -> Result<Tag, HeapError> {
    if bt + WORD > self.arena.len() {
      return Err(corrupted(bt, "boundary tag outside the arena"));
    }
    Ok(self.tag(bt))
  }

  fn check_sentinel(
    &self,
    bt: usize,
  ) -> Result<(), HeapError> {
    let tag = self.checked_tag(bt)?;
    if tag != Tag::new(self.config.min_block_size, true) || self.tag(self.footer_of(bt)) != tag {
      return Err(corrupted(bt, "sentinel tag overwritten"));
    }
    Ok(())
  }

  /// Walks head to tail, requiring every node to be one of the `free` blocks
  /// found by the address walk, each exactly once.
  fn check_free_list(
    &self,
    free: &HashSet<usize>,
  ) -> Result<(), HeapError> {
    if self.prev_in_list(self.head).is_some() || self.next_in_list(self.tail).is_some() {
      return Err(corrupted(self.head, "sentinel links overwritten"));
    }

    let mut seen = 0;
    let mut prev = self.head;

    loop {
      let Some(bt) = self.next_in_list(prev) else {
        return Err(corrupted(prev, "free list ends before the tail sentinel"));
      };
      if bt.checked_add(3 * WORD).is_none_or(|end| end > self.arena.len()) {
        return Err(corrupted(prev, "free list link outside the arena"));
      }
      if self.prev_in_list(bt) != Some(prev) {
        return Err(corrupted(bt, "free list back link mismatch"));
      }
      if bt == self.tail {
        break;
      }
      if !free.contains(&bt) {
        return Err(corrupted(bt, "listed block is not a free block"));
      }
      seen += 1;
      if seen > free.len() {
        return Err(corrupted(bt, "free list revisits a block"));
      }
      prev = bt;
    }

    if seen != free.len() {
      return Err(corrupted(self.head, "free block missing from the free list"));
    }
    Ok(())
  }
}
