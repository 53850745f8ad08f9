//! # tagalloc - A Boundary-Tag Heap Allocator
//!
//! This crate provides a general purpose heap in the style of `malloc`:
//! **allocate**, **release**, **resize** and **zero-allocate** over a single
//! growable arena, with blocks reused through an explicit free list.
//!
//! ## Overview
//!
//! ```text
//!   Arena Layout:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                             ARENA                                    │
//!   │                                                                      │
//!   │   ┌──────────┬──────┬──────────┬──────┬────────────┬──────────────┐  │
//!   │   │ prologue │ used │   free   │ used │    free    │     used     │  │
//!   │   └──────────┴──────┴──────────┴──────┴────────────┴──────────────┘  │
//!   │                          ▲                  ▲             ▲          │
//!   │                          └──── free list ───┘             │          │
//!   │                                                      topmost block   │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   Free blocks are never adjacent: releasing a block merges it with any
//!   free neighbour. The arena only ever grows.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   tagalloc
//!   ├── align      - Alignment rounding (align_to!)
//!   ├── block      - Boundary tag codec and address-order neighbours
//!   ├── arena      - Arena trait, VecArena and SbrkArena
//!   ├── config     - HeapConfig layout parameters
//!   ├── error      - HeapError
//!   ├── heap       - Heap instance, prologue, payload access
//!   ├── free_list  - Explicit LIFO free list
//!   ├── coalesce   - Four-case merging of free neighbours
//!   ├── fit        - Best-fit search and placement
//!   ├── grow       - Arena growth
//!   ├── api        - allocate / release / resize / zero_allocate
//!   └── check      - Consistency checker
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use tagalloc::{Heap, HeapError, VecArena};
//!
//! fn main() -> Result<(), HeapError> {
//!     let mut heap = Heap::new(VecArena::unbounded())?;
//!
//!     let ptr = heap.allocate(32)?.expect("non-zero size");
//!     heap.payload_mut(ptr)[..5].copy_from_slice(b"hello");
//!
//!     let ptr = heap.resize(Some(ptr), 200)?.expect("non-zero size");
//!     assert_eq!(&heap.payload(ptr)[..5], b"hello");
//!
//!     heap.release(Some(ptr));
//!     heap.check_heap(false)?;
//!     Ok(())
//! }
//! ```
//!
//! ## How It Works
//!
//! Each block carries its size and in-use flag twice, in a header and a
//! footer, so both neighbours of any block can be found from addresses alone:
//!
//! ```text
//!   In-use block:
//!   ┌────────┬─────────────────────────────────────────┬────────┐
//!   │ header │              payload                    │ footer │
//!   └────────┴─────────────────────────────────────────┴────────┘
//!            ▲
//!            └── HeapPtr handed to the caller
//!
//!   Free block:
//!   ┌────────┬────────┬────────┬───────────────────────┬────────┐
//!   │ header │  next  │  prev  │                       │ footer │
//!   └────────┴────────┴────────┴───────────────────────┴────────┘
//!                 free-list links overlay the payload
//! ```
//!
//! Allocation rounds the request up to a size class, scans the whole free
//! list for the smallest block that fits, and splits off any remainder large
//! enough to be a block of its own. When nothing fits, the arena grows by
//! exactly the size needed and the new space merges with a free topmost
//! block. Resizing shrinks in place, grows into a free successor when it can,
//! and only otherwise copies into a fresh block.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: a `Heap` has no internal locking
//! - **No shrinking**: the arena is never returned to the system
//! - **No misuse detection on the hot path**: double releases and foreign
//!   pointers corrupt the heap; `check_heap` can find the damage afterwards
//! - **4 GiB arena**: boundary tags are 32-bit, so a heap refuses to grow
//!   past [`HeapConfig::MAX_ARENA_BYTES`]
//! - `SbrkArena` requires a Unix `sbrk(2)` and exclusive use of the break

pub mod align;
mod api;
mod arena;
mod block;
mod check;
mod coalesce;
mod config;
mod error;
mod fit;
mod free_list;
mod grow;
mod heap;

pub use arena::{Arena, SbrkArena, VecArena};
pub use block::{BlockInfo, BlockState, Blocks, Tag, WORD};
pub use check::HeapReport;
pub use config::HeapConfig;
pub use error::HeapError;
pub use free_list::FreeBlocks;
pub use heap::{Heap, HeapPtr};
