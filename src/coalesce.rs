//! Merging of address-adjacent free blocks.
//!
//! ```text
//!   case 1:  [used][ B ][used]   ->  [used][ B ][used]
//!   case 2:  [used][ B ][free]   ->  [used][ B ..... ]
//!   case 3:  [free][ B ][used]   ->  [ P ..... ][used]
//!   case 4:  [free][ B ][free]   ->  [ P ........... ]
//! ```
//!
//! The topmost block has no successor and is treated as if followed by an
//! in-use block.

use log::trace;

use crate::{
  arena::Arena,
  heap::{Heap, HeapPtr},
};

impl<A: Arena> Heap<A> {
  /// Merges the free, unlisted block `bt` with its free neighbours and lists
  /// the result. Returns the payload of the merged block, which starts at the
  /// predecessor when the predecessor was absorbed.
  pub(crate) fn coalesce(
    &mut self,
    bt: usize,
  ) -> HeapPtr {
    let size = self.tag(bt).size();
    let prev = self.prev_block(bt).filter(|&p| self.tag(p).is_free());
    let next = self.next_block(bt).filter(|&n| self.tag(n).is_free());

    let merged = match (prev, next) {
      (None, None) => {
        self.link_after_sentinel(bt);
        bt
      }
      (None, Some(next)) => {
        let size = size + self.tag(next).size();
        self.unlink(next);
        self.make_tags(bt, size, false);
        self.link_after_sentinel(bt);
        if self.last == next {
          self.last = bt;
        }
        bt
      }
      (Some(prev), None) => {
        let size = size + self.tag(prev).size();
        self.unlink(prev);
        self.make_tags(prev, size, false);
        self.link_after_sentinel(prev);
        if self.last == bt {
          self.last = prev;
        }
        prev
      }
      (Some(prev), Some(next)) => {
        let size = size + self.tag(prev).size() + self.tag(next).size();
        self.unlink(prev);
        self.unlink(next);
        self.make_tags(prev, size, false);
        self.link_after_sentinel(prev);
        if self.last == next {
          self.last = prev;
        }
        prev
      }
    };

    trace!(
      "coalesce {bt:#x}: prev_free={} next_free={} -> {merged:#x} ({} bytes)",
      prev.is_some(),
      next.is_some(),
      self.tag(merged).size()
    );

    HeapPtr::from_tag(merged)
  }
}

#[cfg(test)]
mod tests {
  use crate::{arena::VecArena, heap::Heap};

  /// Allocates `n` minimum-sized blocks plus a guard so that none of them is
  /// topmost.
  fn setup(n: usize) -> (Heap<VecArena>, Vec<usize>) {
    let mut heap = Heap::new(VecArena::unbounded()).unwrap();
    let blocks = (0..n)
      .map(|_| heap.allocate(8).unwrap().unwrap().tag())
      .collect();
    heap.allocate(8).unwrap();
    (heap, blocks)
  }

  fn mark_free(
    heap: &mut Heap<VecArena>,
    bt: usize,
  ) {
    let size = heap.tag(bt).size();
    heap.make_tags(bt, size, false);
  }

  #[test]
  fn test_case_1_no_merge() {
    let (mut heap, b) = setup(3);
    mark_free(&mut heap, b[1]);
    let merged = heap.coalesce(b[1]);

    assert_eq!(merged.tag(), b[1]);
    assert_eq!(heap.tag(b[1]).size(), 16);
    assert_eq!(heap.next_in_list(heap.head), Some(b[1]));
    assert!(heap.check_heap(false).is_ok());
  }

  #[test]
  fn test_case_2_absorbs_successor() {
    let (mut heap, b) = setup(3);
    heap.release(Some(crate::HeapPtr::from_tag(b[2])));
    mark_free(&mut heap, b[1]);
    let merged = heap.coalesce(b[1]);

    assert_eq!(merged.tag(), b[1]);
    assert_eq!(heap.tag(b[1]).size(), 32);
    assert_eq!(heap.tag(heap.footer_of(b[1])), heap.tag(b[1]));
    assert_eq!(heap.free_blocks().count(), 1);
    assert!(heap.check_heap(false).is_ok());
  }

  #[test]
  fn test_case_3_absorbed_by_predecessor() {
    let (mut heap, b) = setup(3);
    heap.release(Some(crate::HeapPtr::from_tag(b[0])));
    mark_free(&mut heap, b[1]);
    let merged = heap.coalesce(b[1]);

    assert_eq!(merged.tag(), b[0]);
    assert_eq!(heap.tag(b[0]).size(), 32);
    assert_eq!(heap.free_blocks().count(), 1);
    assert!(heap.check_heap(false).is_ok());
  }

  #[test]
  fn test_case_4_merges_both() {
    let (mut heap, b) = setup(3);
    heap.release(Some(crate::HeapPtr::from_tag(b[0])));
    heap.release(Some(crate::HeapPtr::from_tag(b[2])));
    assert_eq!(heap.free_blocks().count(), 2);

    mark_free(&mut heap, b[1]);
    let merged = heap.coalesce(b[1]);

    assert_eq!(merged.tag(), b[0]);
    assert_eq!(heap.tag(b[0]).size(), 48);
    assert_eq!(heap.free_blocks().count(), 1);
    assert!(heap.check_heap(false).is_ok());
  }

  #[test]
  fn test_topmost_moves_to_predecessor() {
    let mut heap = Heap::new(VecArena::unbounded()).unwrap();
    let a = heap.allocate(8).unwrap();
    let b = heap.allocate(8).unwrap();
    heap.release(a);
    heap.release(b);

    assert_eq!(heap.last_block(), a.unwrap().tag());
    assert_eq!(heap.tag(heap.last_block()).size(), 32);
    assert!(heap.check_heap(false).is_ok());
  }

  #[test]
  fn test_topmost_moves_when_successor_absorbed() {
    let mut heap = Heap::new(VecArena::unbounded()).unwrap();
    let a = heap.allocate(8).unwrap();
    let b = heap.allocate(8).unwrap();
    heap.release(b);
    assert_eq!(heap.last_block(), b.unwrap().tag());

    heap.release(a);
    assert_eq!(heap.last_block(), a.unwrap().tag());
    assert!(heap.check_heap(false).is_ok());
  }
}
