//! Three-tier memory allocation for latency-sensitive hosts.
//!
//! Three cooperating engines share one contract shape (`create`, `alloc`,
//! `free` or `reset`, `stats`, drop-to-destroy) and one observable
//! guarantee: every non-null pointer they return is cache-line aligned.
//!
//! - [`Slab`]: fixed-size blocks from a pre-sized region, handed out
//!   through a lock-free free-index stack. O(1) alloc and free.
//! - [`Arena`]: variable-size bump allocation from a contiguous buffer,
//!   released only in bulk by [`Arena::reset`].
//! - [`Pool`]: a per-thread block cache layered over a shared [`Slab`],
//!   keeping hot alloc/free traffic off the shared counters.
//!
//! The engines are reactive data structures: no operation blocks on
//! another, and all shared state is coordinated with atomics. Hosts are
//! expected to pre-size their working set, treat null from `alloc` as
//! "capacity exhausted", and quiesce all threads before dropping an
//! engine.

pub mod arena;
pub mod error;
pub mod platform;
pub mod pool;
pub mod slab;
pub mod util;

pub use arena::{Arena, ArenaStats};
pub use error::Error;
pub use pool::Pool;
pub use slab::{Slab, SlabStats};
