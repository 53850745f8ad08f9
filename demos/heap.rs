use std::io::Read;

use tagalloc::{Heap, HeapError, HeapPtr, SbrkArena};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`, `gdb`,
/// or just to watch the program break move between steps.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    SbrkArena::program_break(),
  );
}

fn print_alloc(
  heap: &Heap<SbrkArena>,
  requested: usize,
  ptr: HeapPtr,
) {
  println!(
    "Requested {} bytes, usable = {}, address = {:#x}, program break = {:?}",
    requested,
    heap.usable_size(ptr),
    heap.address_of(ptr),
    SbrkArena::program_break(),
  );
}

fn print_blocks(heap: &Heap<SbrkArena>) {
  for block in heap.blocks() {
    println!(
      "    {:#06x}  {:>6} bytes  {}",
      block.offset,
      block.size,
      if block.is_free() { "free" } else { "used" }
    );
  }
}

fn main() -> Result<(), HeapError> {
  print_program_break("start");
  let mut heap = Heap::new(SbrkArena::new())?;
  print_program_break("after prologue");
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 1) Three small allocations, each growing the arena by its block size.
  // --------------------------------------------------------------------
  // Fixed storage: a growing Vec could make the system allocator move the
  // break under us.
  let sizes = [4usize, 12, 40];
  let mut ptrs = [None; 3];
  for (step, &size) in sizes.iter().enumerate() {
    ptrs[step] = heap.allocate(size)?;
    if let Some(ptr) = ptrs[step] {
      println!("\n[1.{}] Allocate {} bytes", step + 1, size);
      print_alloc(&heap, size, ptr);
    }
  }
  let [Some(first), Some(middle), Some(last)] = ptrs else {
    return Ok(());
  };
  print_blocks(&heap);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 2) Release the middle block. It has used neighbours on both sides, so
  //    it stays a separate free block at the head of the free list.
  // --------------------------------------------------------------------
  heap.release(Some(middle));
  println!("\n[2] Released block at {:#x}", heap.address_of(middle));
  print_blocks(&heap);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 3) A small request fits the hole, so the break does not move.
  // --------------------------------------------------------------------
  let reused = heap.allocate(2)?;
  if let Some(ptr) = reused {
    println!("\n[3] Allocate 2 bytes (check reuse of freed block)");
    print_alloc(&heap, 2, ptr);
    println!(
      "[3] reused the freed block? {}",
      if ptr == middle { "Yes" } else { "No" }
    );
  }
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 4) Grow the first block. Its successor is in use, so it moves.
  // --------------------------------------------------------------------
  heap.payload_mut(first)[..4].copy_from_slice(&0xDEADBEEFu32.to_ne_bytes());
  if let Some(moved) = heap.resize(Some(first), 64 * 1024)? {
    println!("\n[4] Resize first block to 64 KiB");
    print_alloc(&heap, 64 * 1024, moved);
    let mut word = [0u8; 4];
    word.copy_from_slice(&heap.payload(moved)[..4]);
    println!("[4] Value carried over = 0x{:X}", u32::from_ne_bytes(word));
    heap.release(Some(moved));
  }
  print_program_break("after large resize");
  print_blocks(&heap);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 5) Release everything. Free neighbours merge, but the arena is never
  //    returned to the system.
  // --------------------------------------------------------------------
  heap.release(reused);
  heap.release(Some(last));
  let report = heap.check_heap(false)?;
  println!("\n[5] {report:?}");
  print_program_break("end");

  Ok(())
}
