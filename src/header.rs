//! Block header: the in-band metadata sitting at the start of every block.
//!
//! Encoding is the signed-size variant of the YAMAL allocator this crate is
//! descended from: `size > 0` means used, `size < 0` means free, and the
//! magnitude is always the block's total footprint (header included). A
//! `size` of exactly zero never occurs in a valid heap and is treated as
//! corruption by [`crate::heap::Heap::guard`].

use core::ptr;

/// Size in bytes of a [`Header`]. Every block's footprint is at least this.
pub const HEADER_SIZE: usize = core::mem::size_of::<Header>();

/// In-band block metadata.
///
/// `next` is the address of the following header in ascending address
/// order, or `null` for the last block in the list. `size` carries both the
/// block's footprint and its free/used state (see module docs).
#[repr(C)]
pub struct Header {
  next: *mut Header,
  size: isize,
}

impl Header {
  /// Writes a fresh header at `addr` with the given footprint and free
  /// state, returning a pointer to it.
  ///
  /// # Safety
  /// `addr` must be valid for a `Header`-sized, `Header`-aligned write.
  pub unsafe fn write(addr: *mut u8, footprint: usize, next: *mut Header, free: bool) -> *mut Header {
    let header = addr as *mut Header;
    let size = if free { -(footprint as isize) } else { footprint as isize };
    // SAFETY: caller guarantees `addr` is valid for a `Header` write.
    unsafe { header.write(Header { next, size }) };
    header
  }

  /// Total bytes this block occupies, header included.
  #[inline]
  pub fn footprint(&self) -> usize {
    self.size.unsigned_abs()
  }

  #[inline]
  pub fn is_free(&self) -> bool {
    self.size < 0
  }

  #[inline]
  pub fn is_used(&self) -> bool {
    self.size > 0
  }

  #[inline]
  pub fn next(&self) -> *mut Header {
    self.next
  }

  #[inline]
  pub fn set_next(&mut self, next: *mut Header) {
    self.next = next;
  }

  /// Sets the footprint, preserving the current free/used state.
  #[inline]
  pub fn set_footprint(&mut self, footprint: usize) {
    self.size = if self.is_free() { -(footprint as isize) } else { footprint as isize };
  }

  #[inline]
  pub fn mark_free(&mut self) {
    self.size = -(self.footprint() as isize);
  }

  #[inline]
  pub fn mark_used(&mut self) {
    self.size = self.footprint() as isize;
  }

  /// Payload address: the first usable byte after this header.
  #[inline]
  pub fn payload(header: *mut Header) -> *mut u8 {
    // SAFETY: offsetting by a fixed, in-bounds amount; caller owns the block.
    unsafe { (header as *mut u8).add(HEADER_SIZE) }
  }

  /// Recovers the header address from a payload pointer previously handed
  /// out by [`Header::payload`].
  #[inline]
  pub fn of_payload(payload: *mut u8) -> *mut Header {
    // SAFETY: every payload pointer this crate hands out trails a header by
    // exactly `HEADER_SIZE` bytes.
    unsafe { payload.sub(HEADER_SIZE) as *mut Header }
  }

  /// Address immediately past this block's footprint — where the next
  /// block's header would sit if one exists.
  #[inline]
  pub fn end_addr(header: *mut Header, footprint: usize) -> *mut u8 {
    // SAFETY: footprint is always in-bounds for a block that actually lives
    // in the heap region; callers only call this with validated footprints.
    unsafe { (header as *mut u8).add(footprint) }
  }
}

/// The null sentinel used for the last block's `next` pointer.
#[inline]
pub const fn null_header() -> *mut Header {
  ptr::null_mut()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn header_size_is_two_words() {
    assert_eq!(HEADER_SIZE, core::mem::size_of::<*mut Header>() + core::mem::size_of::<isize>());
  }

  #[test]
  fn free_used_roundtrip() {
    // Heap-allocated: `Header::write` requires a `Header`-aligned address,
    // which a plain `[u8; 64]` stack array doesn't guarantee.
    let mut buf = vec![0u8; 64];
    let addr = buf.as_mut_ptr();
    unsafe {
      let h = Header::write(addr, 64, null_header(), true);
      assert!((*h).is_free());
      assert_eq!((*h).footprint(), 64);

      (*h).mark_used();
      assert!((*h).is_used());
      assert_eq!((*h).footprint(), 64);

      (*h).set_footprint(32);
      assert!((*h).is_used());
      assert_eq!((*h).footprint(), 32);

      (*h).mark_free();
      assert!((*h).is_free());
      assert_eq!((*h).footprint(), 32);
    }
  }

  #[test]
  fn payload_and_header_of_roundtrip() {
    // Heap-allocated: `Header::write` requires a `Header`-aligned address,
    // which a plain `[u8; 64]` stack array doesn't guarantee.
    let mut buf = vec![0u8; 64];
    let addr = buf.as_mut_ptr();
    unsafe {
      let h = Header::write(addr, 64, null_header(), false);
      let p = Header::payload(h);
      assert_eq!(p, addr.add(HEADER_SIZE));
      assert_eq!(Header::of_payload(p), h);
    }
  }
}
