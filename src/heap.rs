//! The heap instance and its arena layout.
//!
//! ```text
//!   arena offset 0
//!   │
//!   ▼      head sentinel      tail sentinel      first real block
//!   ┌────┬──────────────────┬──────────────────┬──────────────────── ─ ─
//!   │pad │ H │ next │ . │ F │ H │ . │ prev │ F │ H │ payload ...  │ F
//!   └────┴──────────────────┴──────────────────┴──────────────────── ─ ─
//!          ▲                  ▲                  ▲
//!          head               tail               tail + min_block_size
//! ```
//!
//! Both sentinels are permanently in use. The free list starts after `head`
//! and ends before `tail`, so no list operation ever needs a null check. The
//! tail sentinel doubles as the in-use predecessor of the first real block
//! and is the topmost block until the first growth.

use crate::{
  arena::Arena,
  align_to,
  block::WORD,
  config::HeapConfig,
  error::HeapError,
};

/// A payload handle: the arena offset of the first usable byte of a block.
///
/// Payload offsets are always multiples of the configured alignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HeapPtr(usize);

impl HeapPtr {
  pub fn offset(self) -> usize {
    self.0
  }

  pub(crate) fn from_tag(bt: usize) -> Self {
    Self(bt + WORD)
  }

  /// Header offset of the block this payload belongs to.
  pub(crate) fn tag(self) -> usize {
    self.0 - WORD
  }
}

/// A boundary-tag heap with an explicit LIFO free list and best-fit placement.
///
/// The heap owns its arena. All state lives in the arena except the three
/// offsets below; in particular there is no side table of blocks.
pub struct Heap<A: Arena> {
  pub(crate) arena: A,
  pub(crate) config: HeapConfig,
  /// Header of the head sentinel.
  pub(crate) head: usize,
  /// Header of the tail sentinel.
  pub(crate) tail: usize,
  /// Header of the topmost block.
  pub(crate) last: usize,
}

impl<A: Arena> Heap<A> {
  /// Creates a heap with the default layout.
  pub fn new(arena: A) -> Result<Self, HeapError> {
    Self::with_config(arena, HeapConfig::default())
  }

  /// Creates a heap, growing `arena` once for the sentinel prologue.
  pub fn with_config(
    mut arena: A,
    config: HeapConfig,
  ) -> Result<Self, HeapError> {
    config.validate()?;

    let start = arena.len();
    let pad = align_to!(start, config.alignment) - start;
    let bytes = pad + config.prologue_bytes();
    if start.saturating_add(bytes) > HeapConfig::MAX_ARENA_BYTES {
      return Err(HeapError::OutOfMemory { requested: bytes });
    }
    let offset = arena.grow(bytes)?;
    let base = offset + pad;

    let head = base + config.alignment - WORD;
    let tail = head + config.min_block_size;

    let mut heap = Self {
      arena,
      config,
      head,
      tail,
      last: tail,
    };

    heap.make_tags(head, config.min_block_size, true);
    heap.make_tags(tail, config.min_block_size, true);
    heap.splice(head, tail);
    heap.clear_prev(head);
    heap.clear_next(tail);

    log::debug!(
      "heap initialised: head={head:#x} tail={tail:#x} arena={} bytes",
      heap.arena.len()
    );

    Ok(heap)
  }

  pub fn config(&self) -> &HeapConfig {
    &self.config
  }

  pub fn arena(&self) -> &A {
    &self.arena
  }

  /// Gives the arena back, discarding every block.
  pub fn into_arena(self) -> A {
    self.arena
  }

  /// Header offset of the topmost block.
  pub fn last_block(&self) -> usize {
    self.last
  }

  /// Usable bytes behind `ptr`, which may exceed the size requested for it.
  pub fn usable_size(
    &self,
    ptr: HeapPtr,
  ) -> usize {
    self.tag(ptr.tag()).size() - HeapConfig::OVERHEAD
  }

  /// The usable bytes of an allocated block.
  ///
  /// # Panics
  ///
  /// Panics if `ptr` does not lie inside the arena.
  pub fn payload(
    &self,
    ptr: HeapPtr,
  ) -> &[u8] {
    let len = self.usable_size(ptr);
    &self.arena.bytes()[ptr.offset()..ptr.offset() + len]
  }

  /// Mutable access to the usable bytes of an allocated block.
  ///
  /// # Panics
  ///
  /// Panics if `ptr` does not lie inside the arena.
  pub fn payload_mut(
    &mut self,
    ptr: HeapPtr,
  ) -> &mut [u8] {
    let len = self.usable_size(ptr);
    &mut self.arena.bytes_mut()[ptr.offset()..ptr.offset() + len]
  }

  /// Absolute address of `ptr` in the current address space.
  ///
  /// Stable for arenas that never move, such as
  /// [`SbrkArena`](crate::SbrkArena).
  pub fn address_of(
    &self,
    ptr: HeapPtr,
  ) -> usize {
    self.arena.bytes().as_ptr() as usize + ptr.offset()
  }

  pub(crate) fn read_word(
    &self,
    at: usize,
  ) -> u32 {
    let mut word = [0u8; WORD];
    word.copy_from_slice(&self.arena.bytes()[at..at + WORD]);
    u32::from_ne_bytes(word)
  }

  pub(crate) fn write_word(
    &mut self,
    at: usize,
    value: u32,
  ) {
    self.arena.bytes_mut()[at..at + WORD].copy_from_slice(&value.to_ne_bytes());
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::arena::VecArena;

  #[test]
  fn test_prologue_layout() {
    let heap = Heap::new(VecArena::unbounded()).unwrap();

    assert_eq!(heap.head, 12);
    assert_eq!(heap.tail, 28);
    assert_eq!(heap.last, heap.tail);
    assert_eq!(heap.arena.len(), 48);

    assert_eq!(heap.tag(heap.head).size(), 16);
    assert!(heap.tag(heap.head).in_use());
    assert_eq!(heap.tag(heap.footer_of(heap.tail)), heap.tag(heap.tail));

    assert_eq!(heap.next_in_list(heap.head), Some(heap.tail));
    assert_eq!(heap.prev_in_list(heap.tail), Some(heap.head));
    assert_eq!(heap.prev_in_list(heap.head), None);
    assert_eq!(heap.next_in_list(heap.tail), None);
    assert_eq!(heap.blocks().count(), 0);
  }

  #[test]
  fn test_prologue_respects_existing_arena_content() {
    let mut arena = VecArena::unbounded();
    arena.grow(5).unwrap();

    let mut heap = Heap::new(arena).unwrap();
    let ptr = heap.allocate(10).unwrap().unwrap();
    assert_eq!(ptr.offset() % 16, 0);
    assert!(heap.check_heap(false).is_ok());
  }

  #[test]
  fn test_prologue_out_of_memory() {
    let result = Heap::new(VecArena::new(32));
    assert!(matches!(result, Err(HeapError::OutOfMemory { .. })));
  }

  #[test]
  fn test_custom_layout() {
    let config = HeapConfig {
      alignment: 32,
      min_block_size: 64,
    };
    let mut heap = Heap::with_config(VecArena::unbounded(), config).unwrap();
    assert_eq!(heap.arena.len(), 32 + 128);

    let a = heap.allocate(1).unwrap().unwrap();
    let b = heap.allocate(100).unwrap().unwrap();
    assert_eq!(a.offset() % 32, 0);
    assert_eq!(b.offset() % 32, 0);
    assert_eq!(heap.usable_size(a), 56);
    assert_eq!(heap.usable_size(b), 120);
    assert!(heap.check_heap(false).is_ok());
  }

  #[test]
  fn test_invalid_config_is_rejected() {
    let config = HeapConfig {
      alignment: 24,
      min_block_size: 48,
    };
    assert!(matches!(
      Heap::with_config(VecArena::unbounded(), config),
      Err(HeapError::InvalidConfig { .. })
    ));
  }
}
