//! `#[global_allocator]` facade: a [`Heap`] behind a spinlock.
//!
//! This is the only place in the crate that takes a lock. `Heap` itself has
//! no internal synchronization — it assumes single-threaded access, per its
//! own contract — but `GlobalAlloc` requires `Sync`, so something has to
//! serialize concurrent callers. `spin::Mutex` around the raw allocator is
//! the same choice made by embedded `GlobalAlloc` crates like `emballoc`,
//! appropriate here for the same reason: a global allocator runs too early,
//! and in too many contexts, to assume an OS mutex is available.
//!
//! `Heap` only ever hands out payloads aligned to its own configured
//! [`HeapConfig::align`], never to an arbitrary caller-requested
//! [`Layout::align`]. A request stricter than the heap's alignment cannot be
//! satisfied and is rejected with a panic rather than silently handing back
//! an under-aligned pointer.

use core::alloc::{GlobalAlloc, Layout};

use spin::Mutex;

use crate::config::HeapConfig;
use crate::header::HEADER_SIZE;
use crate::heap::Heap;

/// A [`Heap`] wrapped for use as `#[global_allocator]`.
///
/// ```ignore
/// #[global_allocator]
/// static ALLOCATOR: GlobalRegionAllocator = GlobalRegionAllocator::new(HeapConfig::new(base, len));
/// ```
pub struct GlobalRegionAllocator {
  inner: Mutex<Heap>,
}

impl GlobalRegionAllocator {
  /// Wraps `config` for use as a global allocator.
  pub const fn new(config: HeapConfig) -> Self {
    GlobalRegionAllocator { inner: Mutex::new(Heap::new(config)) }
  }

  /// Writes a diagnostic dump of the current heap state to `out`, taking
  /// the lock for the duration of the walk.
  pub fn report(&self, out: &mut dyn core::fmt::Write) {
    self.inner.lock().report(out, None);
  }
}

// SAFETY: `GlobalAlloc`'s contract requires that memory returned by
// `alloc` remain valid (not reused) until passed to `dealloc`, and that
// `layout` match between the two calls. `Heap::allocate` never reuses a
// live block, and `Heap::free`/`Heap::reallocate` only act on the footprint
// recorded in the block's own header, which is derived from `layout.size()`
// at allocation time — the caller-supplied `layout` on the free/realloc
// side is trusted per the trait's own contract, not re-derived here.
unsafe impl GlobalAlloc for GlobalRegionAllocator {
  unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
    let mut heap = self.inner.lock();
    assert!(
      layout.align() <= heap.config().align(),
      "GlobalRegionAllocator: requested alignment {} exceeds the heap's configured alignment {}; \
       build the heap with HeapConfig::with_align using at least that value",
      layout.align(),
      heap.config().align()
    );
    let size = layout.size().max(layout.align());
    heap.allocate(size)
  }

  unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
    self.inner.lock().free(ptr);
  }

  unsafe fn realloc(&self, ptr: *mut u8, _layout: Layout, new_size: usize) -> *mut u8 {
    self.inner.lock().reallocate(ptr, new_size)
  }
}

/// Bytes of heap metadata overhead per allocation, exposed so callers can
/// size a backing buffer for a target number and size of live allocations.
pub const PER_BLOCK_OVERHEAD: usize = HEADER_SIZE;

#[cfg(test)]
mod tests {
  use super::*;
  use core::alloc::{GlobalAlloc, Layout};

  #[test]
  fn global_facade_allocates_and_frees() {
    let mut buf = vec![0u8; 4096];
    let allocator = GlobalRegionAllocator::new(HeapConfig::new(buf.as_mut_ptr(), buf.len()));
    let layout = Layout::from_size_align(64, 8).unwrap();
    unsafe {
      let p = allocator.alloc(layout);
      assert!(!p.is_null());
      allocator.dealloc(p, layout);
    }
  }

  #[test]
  #[should_panic(expected = "exceeds the heap's configured alignment")]
  fn global_facade_rejects_alignment_it_cannot_satisfy() {
    let mut buf = vec![0u8; 4096];
    let allocator = GlobalRegionAllocator::new(HeapConfig::new(buf.as_mut_ptr(), buf.len()));
    let layout = Layout::from_size_align(64, 4096).unwrap();
    unsafe {
      allocator.alloc(layout);
    }
  }
}
