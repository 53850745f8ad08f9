//! Allocate, release, resize and zero-allocate.
//!
//! Every operation returns `Ok(None)` for the defined "no allocation" cases
//! (a zero size) and `Err(HeapError::OutOfMemory)` when the arena cannot grow.
//! Out-of-memory never leaves the heap inconsistent.

use log::{trace, warn};

use crate::{
  arena::Arena,
  config::HeapConfig,
  error::HeapError,
  heap::{Heap, HeapPtr},
};

impl<A: Arena> Heap<A> {
  /// Block size for a `size`-byte request, limited to what a tag can encode.
  fn block_size(
    &self,
    size: usize,
  ) -> Result<usize, HeapError> {
    self
      .config
      .block_size_for(size)
      .filter(|&asize| u32::try_from(asize).is_ok())
      .ok_or(HeapError::OutOfMemory { requested: size })
  }

  /// Allocates at least `size` bytes.
  ///
  /// Reuses the smallest free block that fits, growing the arena by exactly
  /// the needed block size when none does.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<Option<HeapPtr>, HeapError> {
    if size == 0 {
      return Ok(None);
    }

    let asize = self.block_size(size)?;

    if let Some(bt) = self.find_fit(asize) {
      self.place(bt, asize);
      trace!("allocate({size}) -> {:#x} (reused)", bt);
      return Ok(Some(HeapPtr::from_tag(bt)));
    }

    let ptr = self.extend(asize).inspect_err(|_| {
      warn!("allocate({size}) -> out of memory");
    })?;
    self.place(ptr.tag(), asize);
    trace!("allocate({size}) -> {:#x} (grown)", ptr.tag());

    Ok(Some(ptr))
  }

  /// Returns a block to the heap. `None` is a no-op.
  ///
  /// `ptr` must come from this heap and must not have been released since.
  pub fn release(
    &mut self,
    ptr: Option<HeapPtr>,
  ) {
    let Some(ptr) = ptr else {
      return;
    };

    let bt = ptr.tag();
    let size = self.tag(bt).size();
    self.make_tags(bt, size, false);
    self.coalesce(bt);
    trace!("release({bt:#x}) {size} bytes");
  }

  /// Changes the size of a block, moving it only when it cannot be resized in
  /// place.
  ///
  /// A zero `size` releases `ptr`; a `None` pointer allocates. Otherwise the
  /// block shrinks in place, grows into a free successor, or is copied into a
  /// fresh block. When the copy cannot be allocated the original block is
  /// left untouched.
  pub fn resize(
    &mut self,
    ptr: Option<HeapPtr>,
    size: usize,
  ) -> Result<Option<HeapPtr>, HeapError> {
    if size == 0 {
      self.release(ptr);
      return Ok(None);
    }
    let Some(ptr) = ptr else {
      return self.allocate(size);
    };

    let asize = self.block_size(size)?;
    let bt = ptr.tag();
    let old_size = self.tag(bt).size();

    if asize == old_size {
      return Ok(Some(ptr));
    }

    if asize < old_size {
      let rest_size = old_size - asize;
      if rest_size >= self.config.min_block_size {
        self.make_tags(bt, asize, true);
        let rest = bt + asize;
        self.make_tags(rest, rest_size, false);
        if self.last == bt {
          self.last = rest;
        }
        self.coalesce(rest);
      }
      trace!("resize({bt:#x}, {size}) shrank in place");
      return Ok(Some(ptr));
    }

    if let Some(next) = self.next_block(bt).filter(|&n| self.tag(n).is_free()) {
      let total = old_size + self.tag(next).size();
      if asize <= total {
        self.carve(bt, total, asize, next);
        trace!("resize({bt:#x}, {size}) grew into {next:#x}");
        return Ok(Some(ptr));
      }
    }

    let moved = self.allocate(size)?;
    if let Some(new_ptr) = moved {
      let count = (old_size - HeapConfig::OVERHEAD).min(size);
      let from = ptr.offset();
      self
        .arena
        .bytes_mut()
        .copy_within(from..from + count, new_ptr.offset());
      self.release(Some(ptr));
      trace!("resize({bt:#x}, {size}) moved to {:#x}", new_ptr.tag());
    }

    Ok(moved)
  }

  /// Allocates `count * size` zeroed bytes.
  ///
  /// The product is not checked: an overflowing product wraps, as the classic
  /// `calloc` contract this mirrors did. The wrap is logged.
  pub fn zero_allocate(
    &mut self,
    count: usize,
    size: usize,
  ) -> Result<Option<HeapPtr>, HeapError> {
    let bytes = count.checked_mul(size).unwrap_or_else(|| {
      warn!("zero_allocate({count}, {size}): size overflows, wrapping");
      count.wrapping_mul(size)
    });

    let ptr = self.allocate(bytes)?;
    if let Some(ptr) = ptr {
      self.payload_mut(ptr)[..bytes].fill(0);
    }

    Ok(ptr)
  }
}
