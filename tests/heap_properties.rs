use std::collections::BTreeSet;

use tagalloc::{Arena, Heap, HeapError, HeapPtr, VecArena};

fn heap() -> Heap<VecArena> {
  Heap::new(VecArena::unbounded()).unwrap()
}

fn alloc(
  heap: &mut Heap<VecArena>,
  size: usize,
) -> HeapPtr {
  heap.allocate(size).unwrap().unwrap()
}

fn assert_consistent(heap: &Heap<VecArena>) {
  heap.check_heap(false).unwrap();

  let by_address: BTreeSet<usize> = heap
    .blocks()
    .filter(|block| block.is_free())
    .map(|block| block.offset)
    .collect();
  let by_list: BTreeSet<usize> = heap.free_blocks().map(|block| block.offset).collect();
  assert_eq!(by_address, by_list);

  let blocks: Vec<_> = heap.blocks().collect();
  for pair in blocks.windows(2) {
    assert!(!(pair[0].is_free() && pair[1].is_free()));
  }
  if let Some(top) = blocks.last() {
    assert_eq!(top.offset, heap.last_block());
  }
}

#[test]
fn release_then_allocate_reuses_space() {
  let mut heap = heap();

  for n in 1..=10_000 {
    let ptr = alloc(&mut heap, n);
    heap.release(Some(ptr));
    let len = heap.arena().len();

    let again = alloc(&mut heap, n);
    assert_eq!(heap.arena().len(), len, "request of {n} bytes grew the arena");
    assert_eq!(again, ptr);
    heap.release(Some(again));

    if n % 1000 == 0 {
      assert_consistent(&heap);
    }
  }
}

#[test]
fn resize_shrink_preserves_content() {
  let mut heap = heap();
  let ptr = alloc(&mut heap, 100);
  let pattern: Vec<u8> = (0..50).map(|i| (i * 7) as u8).collect();
  heap.payload_mut(ptr)[..50].copy_from_slice(&pattern);

  let shrunk = heap.resize(Some(ptr), 50).unwrap().unwrap();

  assert_eq!(&heap.payload(shrunk)[..50], &pattern[..]);
  assert_consistent(&heap);
}

#[test]
fn resize_past_free_neighbour_relocates() {
  let mut heap = heap();
  let a = alloc(&mut heap, 40);
  let b = alloc(&mut heap, 40);
  let _guard = alloc(&mut heap, 8);
  let pattern: Vec<u8> = (0..40).collect();
  heap.payload_mut(a)[..40].copy_from_slice(&pattern);
  heap.release(Some(b));

  let a_and_b = heap.usable_size(a) + heap.usable_size(b) + 8;
  let moved = heap.resize(Some(a), a_and_b + 64).unwrap().unwrap();

  assert_ne!(moved, a);
  assert_eq!(&heap.payload(moved)[..40], &pattern[..]);
  assert_consistent(&heap);
}

#[test]
fn resize_into_free_neighbour_stays_put() {
  let mut heap = heap();
  let a = alloc(&mut heap, 40);
  let b = alloc(&mut heap, 40);
  let _guard = alloc(&mut heap, 8);
  heap.payload_mut(a).fill(0xab);
  heap.release(Some(b));

  let grown = heap.resize(Some(a), 80).unwrap().unwrap();

  assert_eq!(grown, a);
  assert!(heap.payload(grown)[..40].iter().all(|&byte| byte == 0xab));
  assert_consistent(&heap);
}

#[test]
fn best_fit_ignores_free_order() {
  let mut heap = heap();
  let mut holes = Vec::new();
  for size in [32, 64, 48] {
    holes.push(alloc(&mut heap, size - 8));
    alloc(&mut heap, 8);
  }
  for &hole in &holes {
    heap.release(Some(hole));
  }

  let ptr = alloc(&mut heap, 40);

  assert_eq!(ptr, holes[2]);
  assert_consistent(&heap);
}

#[test]
fn zero_sizes_are_no_allocation() {
  let mut heap = heap();
  let len = heap.arena().len();

  assert_eq!(heap.allocate(0), Ok(None));
  heap.release(None);
  assert_eq!(heap.arena().len(), len);

  let ptr = alloc(&mut heap, 24);
  assert_eq!(heap.resize(Some(ptr), 0), Ok(None));
  assert!(heap.blocks().all(|block| block.is_free()));
  assert_consistent(&heap);
}

#[test]
fn resize_of_nothing_allocates() {
  let mut heap = heap();
  let ptr = heap.resize(None, 64).unwrap().unwrap();
  assert!(heap.usable_size(ptr) >= 64);
  assert_consistent(&heap);
}

#[test]
fn out_of_memory_is_recoverable() {
  let mut heap = Heap::new(VecArena::new(1024)).unwrap();
  let mut live = Vec::new();

  loop {
    match heap.allocate(100) {
      Ok(Some(ptr)) => live.push(ptr),
      Ok(None) => unreachable!("non-zero request"),
      Err(HeapError::OutOfMemory { .. }) => break,
      Err(err) => panic!("unexpected error: {err}"),
    }
  }
  assert!(!live.is_empty());
  assert_consistent(&heap);

  heap.release(live.pop());
  assert!(heap.allocate(100).unwrap().is_some());
  assert_consistent(&heap);
}

#[test]
fn zero_allocate_returns_zeroed_memory() {
  let mut heap = heap();
  let dirty = alloc(&mut heap, 256);
  heap.payload_mut(dirty).fill(0xee);
  heap.release(Some(dirty));

  let ptr = heap.zero_allocate(16, 16).unwrap().unwrap();

  assert!(heap.payload(ptr)[..256].iter().all(|&byte| byte == 0));
  assert_consistent(&heap);
}

#[test]
fn payloads_are_aligned() {
  let mut heap = heap();
  for size in [1, 7, 8, 9, 15, 16, 17, 100, 1000, 4097] {
    let ptr = alloc(&mut heap, size);
    assert_eq!(ptr.offset() % 16, 0);
    assert!(heap.usable_size(ptr) >= size);
  }
  assert_consistent(&heap);
}
