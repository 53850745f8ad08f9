//! Boundary tags.
//!
//! Every block starts with a header word and ends with a footer word holding
//! the same packed value:
//!
//! ```text
//!   31                                   1   0
//!   ┌────────────────────────────────────┬───┐
//!   │          block size (bytes)        │ U │   U = 1 when in use
//!   └────────────────────────────────────┴───┘
//! ```
//!
//! Sizes are multiples of the alignment unit, so bit 0 is always available
//! for the in-use flag.

use crate::{
  arena::Arena,
  heap::{Heap, HeapPtr},
};

/// Width of a boundary tag or free-list link, in bytes.
pub const WORD: usize = 4;

const USED: u32 = 1;

/// A packed boundary tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tag(u32);

impl Tag {
  /// Packs `size` and the in-use flag.
  ///
  /// `size` must be even and fit in 32 bits; callers round and check it
  /// before a tag is ever built.
  pub fn new(
    size: usize,
    in_use: bool,
  ) -> Self {
    debug_assert!(size % 2 == 0 && size <= u32::MAX as usize);
    Self(size as u32 | if in_use { USED } else { 0 })
  }

  pub fn from_raw(raw: u32) -> Self {
    Self(raw)
  }

  pub fn raw(self) -> u32 {
    self.0
  }

  pub fn size(self) -> usize {
    (self.0 & !USED) as usize
  }

  pub fn in_use(self) -> bool {
    self.0 & USED != 0
  }

  pub fn is_free(self) -> bool {
    !self.in_use()
  }
}

/// State of a block as seen through its header.
///
/// Free blocks carry their free-list neighbours, given as header offsets.
/// The links overlay the first payload words, so an in-use block has none.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockState {
  InUse,
  Free {
    next: Option<usize>,
    prev: Option<usize>,
  },
}

/// A decoded block, as yielded by [`Heap::blocks`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
  /// Arena offset of the header.
  pub offset: usize,
  /// Total block size including header and footer.
  pub size: usize,
  pub state: BlockState,
}

impl BlockInfo {
  pub fn is_free(&self) -> bool {
    matches!(self.state, BlockState::Free { .. })
  }

  /// Pointer that was (or would be) handed to the caller for this block.
  pub fn payload(&self) -> HeapPtr {
    HeapPtr::from_tag(self.offset)
  }
}

impl<A: Arena> Heap<A> {
  pub(crate) fn tag(
    &self,
    bt: usize,
  ) -> Tag {
    Tag::from_raw(self.read_word(bt))
  }

  pub(crate) fn make_tag(
    &mut self,
    at: usize,
    size: usize,
    in_use: bool,
  ) {
    self.write_word(at, Tag::new(size, in_use).raw());
  }

  /// Writes matching header and footer for the block at `bt`.
  pub(crate) fn make_tags(
    &mut self,
    bt: usize,
    size: usize,
    in_use: bool,
  ) {
    self.make_tag(bt, size, in_use);
    self.make_tag(bt + size - WORD, size, in_use);
  }

  pub(crate) fn footer_of(
    &self,
    bt: usize,
  ) -> usize {
    bt + self.tag(bt).size() - WORD
  }

  /// Header of the block that follows `bt` by address, or `None` when `bt`
  /// is the topmost block.
  pub(crate) fn next_block(
    &self,
    bt: usize,
  ) -> Option<usize> {
    if bt == self.last {
      return None;
    }
    Some(bt + self.tag(bt).size())
  }

  /// Header of the block that precedes `bt` by address, found through the
  /// preceding footer.
  ///
  /// Only the head sentinel has no predecessor. The first real block sees the
  /// tail sentinel, which is permanently in use.
  pub(crate) fn prev_block(
    &self,
    bt: usize,
  ) -> Option<usize> {
    if bt == self.head {
      return None;
    }
    let footer = Tag::from_raw(self.read_word(bt - WORD));
    Some(bt - footer.size())
  }

  /// Walks the real blocks (sentinels excluded) in address order.
  pub fn blocks(&self) -> Blocks<'_, A> {
    Blocks {
      heap: self,
      next: self.next_block(self.tail),
    }
  }

  pub(crate) fn block_info(
    &self,
    bt: usize,
  ) -> BlockInfo {
    let tag = self.tag(bt);
    let state = if tag.in_use() {
      BlockState::InUse
    } else {
      BlockState::Free {
        next: self.next_in_list(bt),
        prev: self.prev_in_list(bt),
      }
    };
    BlockInfo {
      offset: bt,
      size: tag.size(),
      state,
    }
  }
}

/// Address-order iterator over the blocks of a heap.
pub struct Blocks<'a, A: Arena> {
  heap: &'a Heap<A>,
  next: Option<usize>,
}

impl<A: Arena> Iterator for Blocks<'_, A> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<Self::Item> {
    let bt = self.next?;
    self.next = self.heap.next_block(bt);
    Some(self.heap.block_info(bt))
  }
}
