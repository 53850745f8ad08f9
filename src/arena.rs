//! Growable backing regions.
//!
//! The heap never touches memory directly. It asks an [`Arena`] to extend
//! itself and then addresses every byte by offset from the arena base, so the
//! same algorithms run over an owned buffer or over the real program break.

use std::{ptr, slice};

use libc::{c_void, intptr_t, sbrk};
use log::{debug, warn};

use crate::{align_to, error::HeapError};

/// A contiguous, append-only byte region.
pub trait Arena {
  /// Extends the region by `n_bytes` and returns the offset of the first new
  /// byte. New bytes always follow the previous end directly.
  fn grow(
    &mut self,
    n_bytes: usize,
  ) -> Result<usize, HeapError>;

  /// Current size of the region in bytes.
  fn len(&self) -> usize;

  fn is_empty(&self) -> bool {
    self.len() == 0
  }

  fn bytes(&self) -> &[u8];

  fn bytes_mut(&mut self) -> &mut [u8];
}

/// An arena backed by an owned `Vec<u8>`, optionally capped.
///
/// The cap lets callers exercise out-of-memory paths deterministically.
#[derive(Debug, Default)]
pub struct VecArena {
  data: Vec<u8>,
  limit: usize,
}

impl VecArena {
  /// Creates an arena that refuses to grow past `limit` bytes.
  pub fn new(limit: usize) -> Self {
    Self {
      data: Vec::new(),
      limit,
    }
  }

  pub fn unbounded() -> Self {
    Self::new(usize::MAX)
  }

  pub fn limit(&self) -> usize {
    self.limit
  }
}

impl Arena for VecArena {
  fn grow(
    &mut self,
    n_bytes: usize,
  ) -> Result<usize, HeapError> {
    let offset = self.data.len();
    let new_len = offset
      .checked_add(n_bytes)
      .filter(|&len| len <= self.limit)
      .ok_or(HeapError::OutOfMemory { requested: n_bytes })?;

    self.data.resize(new_len, 0);
    Ok(offset)
  }

  fn len(&self) -> usize {
    self.data.len()
  }

  fn bytes(&self) -> &[u8] {
    &self.data
  }

  fn bytes_mut(&mut self) -> &mut [u8] {
    &mut self.data
  }
}

/// An arena that extends the process data segment with `sbrk(2)`.
///
/// The first growth moves the break up to [`SbrkArena::BASE_ALIGNMENT`] and
/// starts the arena there, so the end of the arena is always the break.
/// Memory is never handed back to the system. If anything else moves the
/// program break between two growths, the region is no longer contiguous and
/// growth reports out-of-memory.
pub struct SbrkArena {
  base: *mut u8,
  len: usize,
}

impl SbrkArena {
  pub const BASE_ALIGNMENT: usize = 16;

  pub fn new() -> Self {
    Self {
      base: ptr::null_mut(),
      len: 0,
    }
  }

  /// Current program break, as reported by `sbrk(0)`.
  pub fn program_break() -> *mut c_void {
    unsafe { sbrk(0) }
  }

  fn raw_sbrk(n_bytes: usize) -> Result<*mut u8, HeapError> {
    let increment =
      intptr_t::try_from(n_bytes).map_err(|_| HeapError::OutOfMemory { requested: n_bytes })?;

    let address = unsafe { sbrk(increment) };

    if address == usize::MAX as *mut c_void {
      warn!("sbrk({n_bytes}) failed");
      return Err(HeapError::OutOfMemory { requested: n_bytes });
    }

    Ok(address as *mut u8)
  }
}

impl Default for SbrkArena {
  fn default() -> Self {
    Self::new()
  }
}

impl Arena for SbrkArena {
  fn grow(
    &mut self,
    n_bytes: usize,
  ) -> Result<usize, HeapError> {
    let offset = self.len;
    let new_len = offset
      .checked_add(n_bytes)
      .ok_or(HeapError::OutOfMemory { requested: n_bytes })?;

    if self.base.is_null() {
      // Align the break itself so that base + len always equals the break.
      let current = Self::raw_sbrk(0)? as usize;
      let pad = align_to!(current, Self::BASE_ALIGNMENT) - current;
      if pad > 0 {
        Self::raw_sbrk(pad)?;
      }
      let base = (current + pad) as *mut u8;
      let address = Self::raw_sbrk(n_bytes)?;
      if address != base {
        warn!("program break moved externally: expected {base:?}, got {address:?}");
        return Err(HeapError::OutOfMemory { requested: n_bytes });
      }
      self.base = base;
      debug!("sbrk arena base at {:?}", self.base);
    } else {
      let expected = self.base.wrapping_add(self.len);
      let address = Self::raw_sbrk(n_bytes)?;
      if address != expected {
        warn!("program break moved externally: expected {expected:?}, got {address:?}");
        return Err(HeapError::OutOfMemory { requested: n_bytes });
      }
    }

    self.len = new_len;
    Ok(offset)
  }

  fn len(&self) -> usize {
    self.len
  }

  fn bytes(&self) -> &[u8] {
    if self.base.is_null() {
      return &[];
    }
    // SAFETY: [base, base + len) was obtained from sbrk by this arena and is
    // never released, so it stays mapped for the life of the process.
    unsafe { slice::from_raw_parts(self.base, self.len) }
  }

  fn bytes_mut(&mut self) -> &mut [u8] {
    if self.base.is_null() {
      return &mut [];
    }
    // SAFETY: as in `bytes`; `&mut self` makes this the only view.
    unsafe { slice::from_raw_parts_mut(self.base, self.len) }
  }
}
