//! Randomized allocate/free/reallocate stress harness. Every live
//! allocation is filled with a pattern derived from its own identity and
//! re-checked before every free, so a coalescing or split bug that
//! corrupts a neighboring block's payload shows up immediately instead of
//! silently passing.

use region_allocator::{Heap, HeapConfig};

/// Small, dependency-free xorshift PRNG. Good enough for picking sizes and
/// deciding which live allocation to touch next; no cryptographic use.
struct XorShift64(u64);

impl XorShift64 {
  fn new(seed: u64) -> Self {
    XorShift64(seed | 1)
  }

  fn next_u64(&mut self) -> u64 {
    let mut x = self.0;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    self.0 = x;
    x
  }

  fn range(&mut self, lo: usize, hi: usize) -> usize {
    lo + (self.next_u64() as usize % (hi - lo))
  }
}

struct Live {
  ptr: *mut u8,
  len: usize,
  pattern: u8,
}

fn fill(live: &Live) {
  unsafe {
    for i in 0..live.len {
      *live.ptr.add(i) = live.pattern.wrapping_add(i as u8);
    }
  }
}

fn check(live: &Live) {
  unsafe {
    for i in 0..live.len {
      let expected = live.pattern.wrapping_add(i as u8);
      let actual = *live.ptr.add(i);
      assert_eq!(actual, expected, "byte pattern corrupted at offset {i} of a {}-byte block", live.len);
    }
  }
}

fn main() {
  const CAPACITY: usize = 1 << 16;
  const ITERATIONS: usize = 20_000;

  let mut buf = vec![0u8; CAPACITY];
  let mut heap = Heap::new(HeapConfig::new(buf.as_mut_ptr(), buf.len()));
  let mut rng = XorShift64::new(0xC0FFEE_u64);
  let mut live: Vec<Live> = Vec::new();
  let mut next_pattern: u8 = 1;

  let mut allocations = 0u64;
  let mut frees = 0u64;
  let mut reallocs = 0u64;
  let mut failures = 0u64;

  for _ in 0..ITERATIONS {
    let roll = rng.range(0, 100);
    if roll < 50 || live.is_empty() {
      let len = rng.range(1, 512);
      let ptr = heap.allocate(len);
      if ptr.is_null() {
        failures += 1;
        continue;
      }
      let entry = Live { ptr, len, pattern: next_pattern };
      next_pattern = next_pattern.wrapping_add(1);
      fill(&entry);
      live.push(entry);
      allocations += 1;
    } else if roll < 80 {
      let index = rng.range(0, live.len());
      let entry = live.swap_remove(index);
      check(&entry);
      heap.free(entry.ptr);
      frees += 1;
    } else {
      let index = rng.range(0, live.len());
      let new_len = rng.range(1, 512);
      let old = &live[index];
      check(old);
      let new_ptr = heap.reallocate(old.ptr, new_len);
      if new_ptr.is_null() {
        failures += 1;
        continue;
      }
      let pattern = next_pattern;
      next_pattern = next_pattern.wrapping_add(1);
      let entry = Live { ptr: new_ptr, len: new_len, pattern };
      fill(&entry);
      live[index] = entry;
      reallocs += 1;
    }
  }

  for entry in &live {
    check(entry);
  }
  for entry in live {
    heap.free(entry.ptr);
  }

  let mut report = String::new();
  heap.report(&mut report, None);
  println!(
    "stress complete: {allocations} allocations, {frees} frees, {reallocs} reallocs, {failures} exhaustion events"
  );
  println!("{report}");
}
