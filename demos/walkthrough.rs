//! Narrates the six scenarios the core allocator is built to satisfy,
//! printing a heap report after each step so the geometry is visible rather
//! than just asserted.

use std::fmt::Write as _;

use region_allocator::{Heap, HeapConfig};

fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let mut line = String::new();
  let _ = std::io::stdin().read_line(&mut line);
}

fn dump(heap: &Heap, label: &str) {
  let mut out = String::new();
  heap.report(&mut out, None);
  println!("\n--- {label} ---\n{out}");
}

fn main() {
  let mut buf = vec![0u8; 8192];
  let mut heap = Heap::new(HeapConfig::new(buf.as_mut_ptr(), buf.len()));

  // --------------------------------------------------------------------
  // S1 - lazy init and size-zero.
  // --------------------------------------------------------------------
  println!("[S1] allocate(0) on a fresh heap");
  let zero = heap.allocate(0);
  println!("[S1] allocate(0) -> {zero:?} (expected base + header)");
  dump(&heap, "S1: after allocate(0)");
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // S2 - best-fit placement.
  // --------------------------------------------------------------------
  println!("[S2] a = allocate(100); b = allocate(150); c = allocate(100); free(b)");
  let a = heap.allocate(100);
  let b = heap.allocate(150);
  let c = heap.allocate(100);
  heap.free(b);
  dump(&heap, "S2: hole left by b");

  println!("[S2] allocate(140) should reuse b's hole, not the trailing tail");
  let reused = heap.allocate(140);
  println!("[S2] b = {b:?}, reused = {reused:?}, equal = {}", reused == b);
  dump(&heap, "S2: after reuse");
  heap.free(reused);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // S3 - shrink-in-place realloc.
  // --------------------------------------------------------------------
  println!("[S3] a = reallocate(a, 40)");
  let shrunk = heap.reallocate(a, 40);
  println!("[S3] a = {a:?}, shrunk = {shrunk:?}, same address = {}", shrunk == a);
  dump(&heap, "S3: after shrink");
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // S4 - grow-by-absorption.
  // --------------------------------------------------------------------
  println!("[S4] free(c), then reallocate(a, 160)");
  heap.free(c);
  dump(&heap, "S4: before grow");
  let grown = heap.reallocate(shrunk, 160);
  println!("[S4] grown = {grown:?}, same address as a = {}", grown == a);
  dump(&heap, "S4: after grow-by-absorption");
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // S5 - relocate fallback.
  // --------------------------------------------------------------------
  println!("[S5] write a byte pattern, then reallocate(a, 350) forces a relocation");
  unsafe {
    for i in 0..100u8 {
      *grown.add(i as usize) = i;
    }
  }
  let relocated = heap.reallocate(grown, 350);
  println!("[S5] relocated = {relocated:?}, moved = {}", relocated != grown);
  let preserved = unsafe { (0..100u8).all(|i| *relocated.add(i as usize) == i) };
  println!("[S5] byte pattern preserved across relocation: {preserved}");
  dump(&heap, "S5: after relocate");
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // S6 - exhaustion and recovery.
  // --------------------------------------------------------------------
  println!("[S6] fill the heap with small allocations until one fails, then free them all back");
  heap.free(relocated);
  let chunk = heap.config().capacity() / 25;
  let mut live = Vec::new();
  loop {
    let p = heap.allocate(chunk);
    if p.is_null() {
      println!("[S6] exhausted after {} allocations of {} bytes each", live.len(), chunk);
      break;
    }
    live.push(p);
  }
  for p in live {
    heap.free(p);
  }
  let recovered = heap.allocate(heap.config().capacity() - 4 * region_allocator::header::HEADER_SIZE);
  println!("[S6] post-recovery allocate near full capacity -> {}", if recovered.is_null() { "null" } else { "ok" });
  dump(&heap, "S6: after full recovery");
}
