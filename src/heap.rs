//! The core allocator: a best-fit, coalescing free list over a single
//! host-supplied buffer.
//!
//! `Heap` owns no memory itself — it only ever writes headers into the
//! buffer described by its [`HeapConfig`]. Every public method here mirrors
//! one operation of the classical allocator triple plus the diagnostic dump;
//! see the crate-level documentation for the invariants they maintain.

use core::fmt::Write as _;
use core::ptr;

use crate::align::align_up;
use crate::config::HeapConfig;
use crate::header::{Header, HEADER_SIZE, null_header};

/// Signature of the overridable memory-copy primitive used by the relocate
/// path of [`Heap::reallocate`]. The default, [`naive_copy`], is a plain
/// byte-by-byte loop; hosts with a faster or DMA-backed `memcpy` can supply
/// their own via [`Heap::set_copy_fn`], the Rust equivalent of overriding a
/// weakly-linked `_acopymem`.
///
/// # Safety
/// Implementations must treat `dst` and `src` as non-overlapping slices of
/// at least `n` bytes each.
pub type CopyFn = unsafe fn(dst: *mut u8, src: *const u8, n: usize);

/// The default [`CopyFn`]: a byte-wise loop with no vectorization.
///
/// # Safety
/// See [`CopyFn`].
pub unsafe fn naive_copy(dst: *mut u8, src: *const u8, n: usize) {
  for i in 0..n {
    // SAFETY: caller guarantees `dst`/`src` are each valid for `n` bytes.
    unsafe { *dst.add(i) = *src.add(i) };
  }
}

/// A single-heap, best-fit, coalescing region allocator.
///
/// Single-threaded by contract (see the crate-level concurrency notes); wrap
/// in [`crate::global::GlobalRegionAllocator`] for `#[global_allocator]` use.
pub struct Heap {
  config: HeapConfig,
  /// Head of the block list, or null before the first call touches the
  /// heap (lazy initialization, see [`Heap::ensure_init`]).
  first: *mut Header,
  copy_fn: CopyFn,
}

// SAFETY: `Heap` is never accessed concurrently under its own contract (see
// §5 of the design notes); the only way to share it across threads is
// through `GlobalRegionAllocator`, which serializes access with a mutex
// before any `Heap` method runs.
unsafe impl Send for Heap {}

impl Heap {
  /// Creates a heap over `config`'s region. The region is not touched until
  /// the first [`Heap::allocate`] or [`Heap::reallocate`] call (lazy
  /// initialization, §4.6 step 2).
  pub const fn new(config: HeapConfig) -> Self {
    Heap { config, first: null_header(), copy_fn: naive_copy }
  }

  /// Overrides the memory-copy primitive used by the relocate path. See
  /// [`CopyFn`].
  pub fn set_copy_fn(&mut self, copy_fn: CopyFn) {
    self.copy_fn = copy_fn;
  }

  /// The configuration this heap was built with.
  pub fn config(&self) -> &HeapConfig {
    &self.config
  }

  fn ensure_init(&mut self) {
    if self.first.is_null() {
      let base = self.config.base();
      // SAFETY: `HeapConfig` guarantees `base` is valid and aligned for
      // `capacity` bytes, which is at least `HEADER_SIZE`.
      let header = unsafe { Header::write(base, self.config.capacity(), null_header(), true) };
      self.first = header;
      log::trace!("heap initialized: {} bytes at {:p}", self.config.capacity(), base);
    }
  }

  /// Bounds/corruption assertion run before dereferencing any header that
  /// came from the list rather than from a fresh `Header::write`. Mirrors
  /// the YAMAL original's `guard()`: on violation it reports and halts,
  /// there being no safe way to continue once the list is suspect.
  fn guard(&self, header: *mut Header) {
    if header.is_null() {
      return;
    }
    let base = self.config.base() as usize;
    let end = self.config.end() as usize;
    let addr = header as usize;
    if addr < base || addr >= end {
      log::error!("heap corrupt: header at {:#x} lies outside [{:#x}, {:#x})", addr, base, end);
      panic!("region-allocator: header out of range, heap corrupted");
    }
    // SAFETY: `addr` was just checked to lie within the region, so the
    // header bytes at that address belong to this heap's buffer.
    let footprint = unsafe { (*header).footprint() };
    if footprint < HEADER_SIZE || footprint > self.config.capacity() {
      log::error!("heap corrupt: block at {:#x} has footprint {}", addr, footprint);
      panic!("region-allocator: implausible block footprint, heap corrupted");
    }
    // SAFETY: same as above.
    let next = unsafe { (*header).next() };
    if !next.is_null() {
      let next_addr = next as usize;
      if next_addr < base || next_addr > end {
        log::error!("heap corrupt: block at {:#x} points past the region via next={:#x}", addr, next_addr);
        panic!("region-allocator: next pointer out of range, heap corrupted");
      }
    }
  }

  /// Splits `header` at footprint `target` if the remainder can host a
  /// header plus at least one payload byte (§4.2). Leaves `header` intact
  /// otherwise.
  ///
  /// # Safety
  /// `header` must be a valid, in-range block header with
  /// `footprint(header) >= target`.
  unsafe fn split(&mut self, header: *mut Header, target: usize) {
    // SAFETY: caller guarantees `header` is valid.
    let footprint = unsafe { (*header).footprint() };
    debug_assert!(target <= footprint, "split target exceeds block footprint");
    let remainder = footprint - target;
    if remainder < HEADER_SIZE + 1 {
      return;
    }
    let tail_addr = Header::end_addr(header, target);
    // SAFETY: caller guarantees `header` is valid.
    let next = unsafe { (*header).next() };
    // SAFETY: `tail_addr` is `target` bytes into a block of `footprint`
    // bytes, and `remainder >= HEADER_SIZE + 1`, so the tail fits entirely
    // within the original block.
    let tail = unsafe { Header::write(tail_addr, remainder, next, true) };
    // SAFETY: caller guarantees `header` is valid.
    unsafe {
      (*header).set_footprint(target);
      (*header).set_next(tail);
    }
    log::trace!("split {:p}: {} -> used {} + free {}", header, footprint, target, remainder);
  }

  /// Merges `right` into `left` when `right` is free and `left.next ==
  /// right` (§4.3). Returns whether the merge happened. Does not itself
  /// require `left` to be free — grow-by-absorption during realloc joins a
  /// used block with a free successor.
  ///
  /// # Safety
  /// `left` and `right` must be valid, in-range headers with `left.next ==
  /// right`.
  unsafe fn join(&mut self, left: *mut Header, right: *mut Header) -> bool {
    // SAFETY: caller guarantees both headers are valid.
    unsafe {
      if !(*right).is_free() {
        return false;
      }
      let left_fp = (*left).footprint();
      let right_fp = (*right).footprint();
      (*left).set_next((*right).next());
      (*left).set_footprint(left_fp + right_fp);
    }
    true
  }

  /// Sweeps the whole list joining runs of adjacent free blocks (§4.4,
  /// "tie-adjacent"). O(n) in the current block count.
  fn coalesce_walk(&mut self) {
    let mut current = self.first;
    while !current.is_null() {
      self.guard(current);
      // SAFETY: `current` just passed `guard`.
      let next = unsafe { (*current).next() };
      if next.is_null() {
        break;
      }
      self.guard(next);
      // SAFETY: both `current` and `next` just passed `guard`.
      let (current_free, next_free) = unsafe { ((*current).is_free(), (*next).is_free()) };
      if current_free && next_free {
        // SAFETY: both headers validated above, and `current.next == next`.
        unsafe { self.join(current, next) };
        // stay on `current`: it may now be adjacent to a further free block
      } else {
        current = next;
      }
    }
  }

  /// Linear best-fit search (§4.5): the smallest free block whose footprint
  /// is at least `requested_footprint`, ties broken by earliest address.
  fn best_fit(&self, requested_footprint: usize) -> *mut Header {
    let mut current = self.first;
    let mut best = null_header();
    let mut best_footprint = usize::MAX;
    while !current.is_null() {
      self.guard(current);
      // SAFETY: `current` just passed `guard`.
      unsafe {
        if (*current).is_free() {
          let footprint = (*current).footprint();
          if footprint >= requested_footprint && footprint < best_footprint {
            best = current;
            best_footprint = footprint;
          }
        }
        current = (*current).next();
      }
    }
    best
  }

  /// Allocates `n` payload bytes (§4.6). Returns a properly aligned payload
  /// pointer, or null if no block fits.
  pub fn allocate(&mut self, n: usize) -> *mut u8 {
    if n > self.config.capacity() {
      log::debug!("allocate({}) rejected: exceeds capacity {}", n, self.config.capacity());
      return ptr::null_mut();
    }
    self.ensure_init();
    if n == 0 {
      log::trace!("allocate(0) -> sentinel payload");
      // SAFETY: `ensure_init` guarantees `self.first` is a valid header.
      return Header::payload(self.first);
    }

    let requested_footprint = align_up(n + HEADER_SIZE, self.config.align());
    let mut found = self.best_fit(requested_footprint);
    if found.is_null() {
      self.coalesce_walk();
      found = self.best_fit(requested_footprint);
    }
    if found.is_null() {
      log::debug!("allocate({}) failed: no block fits footprint {}", n, requested_footprint);
      return ptr::null_mut();
    }

    // SAFETY: `found` came from `best_fit`, which only returns headers that
    // passed `guard`.
    unsafe {
      (*found).mark_used();
      self.split(found, requested_footprint);
    }
    let payload = Header::payload(found);
    log::trace!("allocate({}) -> {:p}", n, payload);
    payload
  }

  /// Frees a previously allocated payload (§4.7). Null is a no-op; freeing
  /// an already-free block is a no-op.
  pub fn free(&mut self, p: *mut u8) {
    if p.is_null() {
      return;
    }
    let header = Header::of_payload(p);
    self.guard(header);
    // SAFETY: `header` just passed `guard`.
    let already_free = unsafe { (*header).is_free() };
    if already_free {
      return;
    }
    // SAFETY: `header` just passed `guard`.
    unsafe { (*header).mark_free() };
    log::trace!("free({:p})", p);
    self.coalesce_walk();
  }

  /// Grows, shrinks, or relocates a previously allocated payload (§4.8).
  pub fn reallocate(&mut self, p: *mut u8, n: usize) -> *mut u8 {
    if p.is_null() {
      return self.allocate(n);
    }
    if n == 0 {
      self.free(p);
      return ptr::null_mut();
    }

    let header = Header::of_payload(p);
    self.guard(header);
    let target = align_up(n + HEADER_SIZE, self.config.align());
    // SAFETY: `header` just passed `guard`.
    let footprint = unsafe { (*header).footprint() };

    if footprint >= target {
      // SAFETY: `header` just passed `guard`, and `footprint >= target`.
      unsafe { self.split(header, target) };
      return p;
    }

    // SAFETY: `header` just passed `guard`.
    let next = unsafe { (*header).next() };
    if !next.is_null() {
      self.guard(next);
      // SAFETY: `next` just passed `guard`.
      let (next_free, next_footprint) = unsafe { ((*next).is_free(), (*next).footprint()) };
      if next_free && footprint + next_footprint >= target {
        // SAFETY: `header`/`next` validated above, `header.next == next`.
        unsafe {
          self.join(header, next);
          self.split(header, target);
        }
        return p;
      }
    }

    let new_payload = self.allocate(n);
    if new_payload.is_null() {
      log::debug!("reallocate({:p}, {}) failed: relocate had no room, original preserved", p, n);
      return ptr::null_mut();
    }
    let old_payload_size = footprint - HEADER_SIZE;
    let copy_len = core::cmp::min(old_payload_size, n);
    // SAFETY: `new_payload` was just allocated with at least `n` bytes of
    // payload and `p` has `old_payload_size >= copy_len` usable bytes; the
    // two regions are disjoint since `new_payload` is a fresh block.
    unsafe { (self.copy_fn)(new_payload, p, copy_len) };
    self.free(p);
    log::trace!("reallocate({:p}, {}) -> relocated to {:p}", p, n, new_payload);
    new_payload
  }

  /// Walks the list, validating every invariant from §3 and §4.9, and
  /// writing a per-block line plus a summary to `out`. If `focus` is
  /// `Some`, only that block's line (plus the walk's validation) runs — no
  /// summary is printed, matching the original's "print a single block"
  /// mode. Halts on the first invariant violation found (see
  /// [`Heap::guard`]).
  pub fn report(&self, out: &mut dyn core::fmt::Write, focus: Option<*mut u8>) {
    let focus_header = focus.map(Header::of_payload);
    let mut current = self.first;
    let mut index = 0usize;
    let (mut free_blocks, mut used_blocks) = (0usize, 0usize);
    let (mut free_payload, mut used_payload) = (0usize, 0usize);

    while !current.is_null() {
      self.guard(current);
      // SAFETY: `current` just passed `guard`.
      let (footprint, next, free) = unsafe { ((*current).footprint(), (*current).next(), (*current).is_free()) };
      let payload_size = footprint - HEADER_SIZE;

      if !next.is_null() {
        let expected_next = Header::end_addr(current, footprint);
        if expected_next != next as *mut u8 {
          log::error!(
            "heap corrupt: block at {:p} ends at {:p} but next header is at {:p}",
            current,
            expected_next,
            next
          );
          panic!("region-allocator: blocks do not tile the region, heap corrupted");
        }
      } else {
        let region_end = self.config.end();
        if Header::end_addr(current, footprint) != region_end {
          log::error!("heap corrupt: last block at {:p} does not reach the region end {:p}", current, region_end);
          panic!("region-allocator: last block does not reach the region end, heap corrupted");
        }
      }

      if free {
        free_blocks += 1;
        free_payload += payload_size;
      } else {
        used_blocks += 1;
        used_payload += payload_size;
      }

      if focus_header.is_none() || focus_header == Some(current) {
        let _ = writeln!(
          out,
          "#{index}\t{}\taddr={:p} next={:p} footprint={} payload={}",
          if free { "free" } else { "used" },
          current,
          next,
          footprint,
          payload_size
        );
      }

      current = next;
      index += 1;
    }

    if focus_header.is_none() {
      let _ = writeln!(
        out,
        "summary: {} blocks ({} free / {} used), {} free bytes, {} used bytes, capacity {}",
        index,
        free_blocks,
        used_blocks,
        free_payload,
        used_payload,
        self.config.capacity()
      );
    }
  }

  /// Non-panicking counterpart to the checks `guard`/`report` perform:
  /// walks the whole list and returns `false` at the first invariant
  /// violation instead of halting. [`crate::checked::CheckedHeap`] calls
  /// this before delegating, to translate corruption into
  /// [`crate::checked::AllocError::Corrupt`] rather than a panic.
  pub fn is_consistent(&self) -> bool {
    let base = self.config.base() as usize;
    let end = self.config.end() as usize;
    let mut current = self.first;
    while !current.is_null() {
      let addr = current as usize;
      if addr < base || addr >= end {
        return false;
      }
      // SAFETY: `addr` was just checked to lie within the region.
      let (footprint, next) = unsafe { ((*current).footprint(), (*current).next()) };
      if footprint < HEADER_SIZE || footprint > self.config.capacity() {
        return false;
      }
      if !next.is_null() {
        if Header::end_addr(current, footprint) != next as *mut u8 {
          return false;
        }
      } else if Header::end_addr(current, footprint) != self.config.end() {
        return false;
      }
      current = next;
    }
    true
  }
}
