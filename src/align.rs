/// Rounds `value` up to the next multiple of `unit`, which must be a power of two.
///
/// # Examples
///
/// ```rust
/// use tagalloc::align_to;
///
/// assert_eq!(align_to!(0, 16), 0);
/// assert_eq!(align_to!(1, 16), 16);
/// assert_eq!(align_to!(24, 16), 32);
/// assert_eq!(align_to!(32, 16), 32);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $unit:expr) => {
    ($value + $unit - 1) & !($unit - 1)
  };
}

/// Checked variant of [`align_to!`] for sizes that come from callers.
///
/// Returns `None` when rounding would overflow `usize`.
pub(crate) fn checked_align_to(
  value: usize,
  unit: usize,
) -> Option<usize> {
  Some(value.checked_add(unit - 1)? & !(unit - 1))
}
