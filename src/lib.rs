//! # region-allocator - A Coalescing Best-Fit Region Allocator
//!
//! This crate provides a **single-heap, header-embedded, best-fit,
//! coalescing** allocator over a buffer the host supplies — no `sbrk`, no
//! OS, `no_std` by default.
//!
//! ## Overview
//!
//! Every block carries its own header in-band, right before its payload:
//!
//! ```text
//!   One block:
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │       Header          │           Payload              │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ next: ptr/null  │  │  ┌──────────────────────────┐  │
//!   │  │ size: ±footprint│  │  │      N usable bytes      │  │
//!   │  └─────────────────┘  │  └──────────────────────────┘  │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── pointer returned to the caller
//! ```
//!
//! `size`'s sign carries the free/used state; its magnitude is always the
//! block's total footprint, header included. Blocks tile the region with no
//! gaps: `addr(block) + footprint(block) == addr(block.next)` for every
//! non-last block.
//!
//! ```text
//!   The whole region, four blocks, address ascending:
//!
//!   ┌──────────┬───────────────┬──────────┬────────────────────────────┐
//!   │  used A  │    free       │  used B  │          free              │
//!   └──────────┴───────────────┴──────────┴────────────────────────────┘
//!   base                                                              base+capacity
//! ```
//!
//! ## Crate structure
//!
//! ```text
//!   region_allocator
//!   ├── align    - alignment arithmetic
//!   ├── header   - in-band block header, signed-size encoding
//!   ├── config   - validated (base, capacity, alignment) triple
//!   ├── heap     - Heap: split, join, coalesce walk, best fit, the four ops
//!   ├── global   - GlobalRegionAllocator: Heap behind a spin::Mutex, GlobalAlloc
//!   └── checked  - CheckedHeap: Result-returning front door over Heap
//! ```
//!
//! ## Quick start
//!
//! ```
//! use region_allocator::{Heap, HeapConfig};
//!
//! let mut buf = vec![0u8; 4096];
//! let mut heap = Heap::new(HeapConfig::new(buf.as_mut_ptr(), buf.len()));
//!
//! let p = heap.allocate(64);
//! assert!(!p.is_null());
//! heap.free(p);
//! ```
//!
//! ## Allocation strategy
//!
//! [`Heap::allocate`] searches the whole block list for the smallest free
//! block that fits (best-fit), breaking ties by earliest address. On a
//! miss, it performs one more coalescing sweep merging every run of
//! adjacent free blocks and searches again before giving up. [`Heap::free`]
//! always coalesces its block with its neighbors immediately, so adjacent
//! free pairs never persist across calls; the deferred-to-miss sweep inside
//! `allocate` exists only to catch merges that a chain of frees elsewhere in
//! the list couldn't have produced on its own.
//!
//! ## Limitations
//!
//! - **Single-threaded by contract**: [`Heap`] has no internal locking; wrap
//!   it in [`GlobalRegionAllocator`] for shared/`#[global_allocator]` use.
//! - **Fixed capacity**: the region never grows once configured.
//! - **Linear search**: best-fit and coalescing are both O(n) in the live
//!   block count, appropriate for the small, long-lived heaps this crate
//!   targets, not for allocator-microbenchmark workloads.
//!
//! ## Safety
//!
//! This crate manages raw memory directly. Every public entry point that
//! touches the region is either safe-by-construction (validated inputs,
//! internal invariants upheld by [`Heap::guard`]-equivalent checks) or
//! documents its safety obligations at the `unsafe` boundary.

#![cfg_attr(not(test), no_std)]

pub mod align;
pub mod checked;
pub mod config;
#[cfg(feature = "global")]
pub mod global;
pub mod header;
pub mod heap;

pub use checked::{AllocError, CheckedHeap};
pub use config::HeapConfig;
#[cfg(feature = "global")]
pub use global::GlobalRegionAllocator;
pub use heap::{CopyFn, Heap};
