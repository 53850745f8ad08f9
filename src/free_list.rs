//! The explicit free list.
//!
//! Free blocks are threaded into a doubly linked list anchored by the two
//! sentinels. The links overlay the first two payload words:
//!
//! ```text
//!   ┌────────┬────────┬────────┬─────────────────┬────────┐
//!   │ header │  next  │  prev  │   (unused)      │ footer │
//!   └────────┴────────┴────────┴─────────────────┴────────┘
//!              i32 word distances from this header, 0 = none
//! ```
//!
//! Insertion is always right after the head sentinel, so the list is ordered
//! by recency: the most recently freed block is examined first.

use crate::{arena::Arena, block::WORD, heap::Heap};

const NEXT: usize = WORD;
const PREV: usize = 2 * WORD;

impl<A: Arena> Heap<A> {
  fn read_link(
    &self,
    bt: usize,
    slot: usize,
  ) -> isize {
    self.read_word(bt + slot) as i32 as isize
  }

  fn write_link(
    &mut self,
    bt: usize,
    slot: usize,
    target: usize,
  ) {
    let distance = (target as isize - bt as isize) / WORD as isize;
    self.write_word(bt + slot, distance as i32 as u32);
  }

  fn resolve(
    bt: usize,
    distance: isize,
  ) -> usize {
    bt.wrapping_add_signed(distance * WORD as isize)
  }

  /// Successor of `bt` in list order. A listed free block always has one.
  pub(crate) fn next_link(
    &self,
    bt: usize,
  ) -> usize {
    Self::resolve(bt, self.read_link(bt, NEXT))
  }

  /// Predecessor of `bt` in list order. A listed free block always has one.
  pub(crate) fn prev_link(
    &self,
    bt: usize,
  ) -> usize {
    Self::resolve(bt, self.read_link(bt, PREV))
  }

  pub(crate) fn next_in_list(
    &self,
    bt: usize,
  ) -> Option<usize> {
    match self.read_link(bt, NEXT) {
      0 => None,
      distance => Some(Self::resolve(bt, distance)),
    }
  }

  pub(crate) fn prev_in_list(
    &self,
    bt: usize,
  ) -> Option<usize> {
    match self.read_link(bt, PREV) {
      0 => None,
      distance => Some(Self::resolve(bt, distance)),
    }
  }

  pub(crate) fn clear_next(
    &mut self,
    bt: usize,
  ) {
    self.write_word(bt + NEXT, 0);
  }

  pub(crate) fn clear_prev(
    &mut self,
    bt: usize,
  ) {
    self.write_word(bt + PREV, 0);
  }

  /// Makes `prev` and `next` direct list neighbours, dropping whatever was
  /// linked between them.
  pub(crate) fn splice(
    &mut self,
    prev: usize,
    next: usize,
  ) {
    self.write_link(prev, NEXT, next);
    self.write_link(next, PREV, prev);
  }

  /// Detaches a listed free block.
  pub(crate) fn unlink(
    &mut self,
    bt: usize,
  ) {
    let prev = self.prev_link(bt);
    let next = self.next_link(bt);
    self.splice(prev, next);
  }

  /// Pushes `bt` onto the front of the list.
  pub(crate) fn link_after_sentinel(
    &mut self,
    bt: usize,
  ) {
    let first = self.next_link(self.head);
    self.splice(bt, first);
    self.splice(self.head, bt);
  }

  /// Walks the free blocks in list order, most recently inserted first.
  pub fn free_blocks(&self) -> FreeBlocks<'_, A> {
    FreeBlocks {
      heap: self,
      next: self.next_in_list(self.head),
    }
  }
}

/// List-order iterator over the free blocks of a heap.
pub struct FreeBlocks<'a, A: Arena> {
  heap: &'a Heap<A>,
  next: Option<usize>,
}

impl<A: Arena> Iterator for FreeBlocks<'_, A> {
  type Item = crate::block::BlockInfo;

  fn next(&mut self) -> Option<Self::Item> {
    let bt = self.next.filter(|&bt| bt != self.heap.tail)?;
    self.next = self.heap.next_in_list(bt);
    Some(self.heap.block_info(bt))
  }
}
