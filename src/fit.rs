//! Best-fit search and block placement.

use log::trace;

use crate::{arena::Arena, heap::Heap};

impl<A: Arena> Heap<A> {
  /// Smallest free block of at least `asize` bytes, scanning the whole list.
  ///
  /// On equal sizes the block found first in list order wins.
  pub(crate) fn find_fit(
    &self,
    asize: usize,
  ) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    let mut current = self.next_in_list(self.head);

    while let Some(bt) = current {
      let tag = self.tag(bt);
      if tag.is_free() && tag.size() >= asize && best.is_none_or(|(_, size)| tag.size() < size) {
        best = Some((bt, tag.size()));
        if tag.size() == asize {
          break;
        }
      }
      current = self.next_in_list(bt);
    }

    best.map(|(bt, _)| bt)
  }

  /// Marks `asize` bytes of the listed free block `bt` as in use.
  pub(crate) fn place(
    &mut self,
    bt: usize,
    asize: usize,
  ) {
    let total = self.tag(bt).size();
    self.carve(bt, total, asize, bt);
  }

  /// Turns the `total` bytes starting at `bt` into an in-use block of `asize`
  /// bytes, where `node` is the listed free block whose space is being
  /// consumed. A remainder of at least the minimum block size becomes a free
  /// block that takes over `node`'s list position; a smaller one stays inside
  /// the in-use block.
  pub(crate) fn carve(
    &mut self,
    bt: usize,
    total: usize,
    asize: usize,
    node: usize,
  ) {
    let prev = self.prev_link(node);
    let next = self.next_link(node);
    let rest_size = total - asize;

    if rest_size >= self.config.min_block_size {
      self.make_tags(bt, asize, true);
      let rest = bt + asize;
      self.make_tags(rest, rest_size, false);
      self.splice(prev, rest);
      self.splice(rest, next);
      if self.last == node {
        self.last = rest;
      }
      trace!("split {bt:#x}: {asize} used, {rest_size} left at {rest:#x}");
    } else {
      self.splice(prev, next);
      self.make_tags(bt, total, true);
      if self.last == node {
        self.last = bt;
      }
      trace!("consumed {bt:#x} whole: {total} bytes for {asize}");
    }
  }
}
