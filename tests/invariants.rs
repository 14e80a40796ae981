//! Property-based checks of the ten universal invariants, exercised over
//! arbitrary sequences of allocate/free/reallocate calls.

use proptest::prelude::*;
use region_allocator::header::HEADER_SIZE;
use region_allocator::{Heap, HeapConfig};

const CAPACITY: usize = 8192;

#[derive(Debug, Clone)]
enum Op {
  Alloc(usize),
  Free(usize),
  Realloc(usize, usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
  prop_oneof![
    (1usize..600).prop_map(Op::Alloc),
    (0usize..16).prop_map(Op::Free),
    ((0usize..16), (0usize..600)).prop_map(|(i, n)| Op::Realloc(i, n)),
  ]
}

/// Walks the live block list, asserting invariants 1-4 hold right now.
fn assert_structural_invariants(heap: &Heap) {
  let mut report = String::new();
  // `report` itself walks the list validating tiling and bounds (invariants
  // 1 and 2) and panics on violation, so simply calling it exercises those.
  heap.report(&mut report, None);

  let base = heap.config().base() as usize;
  let end = heap.config().end() as usize;
  assert!(end - base == CAPACITY);

  // Re-derive footprint sum and the no-adjacent-free-pair property (3, 4)
  // from the same report text by re-walking via the public API: allocate a
  // zero-byte probe is not enough, so we reconstruct geometry with a second
  // heap-local walk using `report`'s line format.
  let mut total_footprint = 0usize;
  let mut prev_free: Option<bool> = None;
  for line in report.lines() {
    if !line.starts_with('#') {
      continue;
    }
    let is_free = line.contains("\tfree\t");
    let footprint = line
      .split("footprint=")
      .nth(1)
      .and_then(|rest| rest.split_whitespace().next())
      .and_then(|s| s.parse::<usize>().ok())
      .expect("report line must carry a footprint field");
    assert!(footprint >= HEADER_SIZE && footprint <= CAPACITY, "invariant 1 violated: footprint {footprint}");
    total_footprint += footprint;
    if let Some(prev) = prev_free {
      assert!(!(prev && is_free), "invariant 4 violated: two adjacent free blocks survived coalescing");
    }
    prev_free = Some(is_free);
  }
  assert_eq!(total_footprint, CAPACITY, "invariant 3 violated: footprints do not sum to capacity");
}

proptest! {
  #[test]
  fn invariants_hold_after_arbitrary_op_sequences(ops in prop::collection::vec(op_strategy(), 0..60)) {
    let mut buf = vec![0u8; CAPACITY];
    let mut heap = Heap::new(HeapConfig::new(buf.as_mut_ptr(), buf.len()));
    let mut live: Vec<*mut u8> = Vec::new();

    for op in ops {
      match op {
        Op::Alloc(n) => {
          let p = heap.allocate(n);
          if !p.is_null() {
            live.push(p);
          }
        }
        Op::Free(index) => {
          if !live.is_empty() {
            let p = live.remove(index % live.len());
            heap.free(p);
          }
        }
        Op::Realloc(index, n) => {
          if !live.is_empty() {
            let i = index % live.len();
            let p = live[i];
            let out = heap.reallocate(p, n);
            if n == 0 {
              live.remove(i);
            } else if !out.is_null() {
              live[i] = out;
            }
            // a failed grow (out null, n != 0) leaves `p` valid and untouched (invariant 8)
          }
        }
      }
      assert_structural_invariants(&heap);
    }
  }

  #[test]
  fn oversized_allocation_always_rejected(n in (CAPACITY + 1)..(CAPACITY * 4)) {
    let mut buf = vec![0u8; CAPACITY];
    let mut heap = Heap::new(HeapConfig::new(buf.as_mut_ptr(), buf.len()));
    prop_assert!(heap.allocate(n).is_null());
  }

  #[test]
  fn reallocate_to_same_size_is_identity(n in 1usize..600) {
    let mut buf = vec![0u8; CAPACITY];
    let mut heap = Heap::new(HeapConfig::new(buf.as_mut_ptr(), buf.len()));
    let p = heap.allocate(n);
    prop_assume!(!p.is_null());
    let q = heap.reallocate(p, n);
    prop_assert_eq!(p, q);
  }

  #[test]
  fn pattern_survives_growing_reallocate(n in 1usize..200, grow in 0usize..200) {
    let mut buf = vec![0u8; CAPACITY];
    let mut heap = Heap::new(HeapConfig::new(buf.as_mut_ptr(), buf.len()));
    let p = heap.allocate(n);
    prop_assume!(!p.is_null());
    unsafe {
      for i in 0..n {
        *p.add(i) = (i % 251) as u8;
      }
    }
    let m = n + grow;
    let q = heap.reallocate(p, m);
    prop_assume!(!q.is_null());
    unsafe {
      for i in 0..n {
        prop_assert_eq!(*q.add(i), (i % 251) as u8);
      }
    }
  }
}
