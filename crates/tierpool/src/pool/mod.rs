//! Tiered engine: a per-thread free-block cache over a shared [`Slab`].
//!
//! The hot path never touches the shared slab. `alloc` pops the calling
//! thread's cache while it has blocks; `free` pushes while it has room.
//! Only a cache miss (empty on alloc, full on free) falls through to the
//! slab and its atomic counters.

use crate::error::Error;
use crate::slab::{Slab, SlabStats};
use std::sync::atomic::{AtomicU64, Ordering};

mod thread_cache;

/// Monotonic pool identities. Never reused, so a stale thread-cache entry
/// left behind by a dropped pool can never match a live one.
static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// A thread-tiered block pool.
///
/// Composes a per-thread cache of up to `blocks_per_thread` pointers with
/// a shared [`Slab`] of `total_blocks`. Caches are created lazily on a
/// thread's first call and their storage is reclaimed when the thread
/// exits; blocks still parked in a cache at that point stay checked out of
/// the slab.
///
/// The host must quiesce all threads before dropping the pool: thread
/// caches still holding blocks are simply abandoned (the backing mapping
/// dies with the slab).
pub struct Pool {
    slab: Slab,
    blocks_per_thread: usize,
    id: u64,
}

impl Pool {
    /// Create a pool of `total_blocks` blocks of `block_size` bytes, with
    /// per-thread caches of `blocks_per_thread` slots.
    ///
    /// All three arguments must be nonzero ([`Error::InvalidArgs`]); slab
    /// construction failures propagate.
    pub fn create(
        block_size: usize,
        blocks_per_thread: usize,
        total_blocks: usize,
    ) -> Result<Self, Error> {
        if block_size == 0 || blocks_per_thread == 0 || total_blocks == 0 {
            return Err(Error::InvalidArgs);
        }
        let slab = Slab::create(block_size, total_blocks)?;
        Ok(Pool {
            slab,
            blocks_per_thread,
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
        })
    }

    /// Allocate a block, preferring the calling thread's cache. Returns a
    /// cache-line-aligned pointer, or null when both the cache and the
    /// shared slab are exhausted.
    ///
    /// When the thread cache is unusable (storage could not be reserved,
    /// or the thread is tearing down) the call degrades to the slab
    /// directly.
    pub fn alloc(&self) -> *mut u8 {
        let cached =
            thread_cache::with_cache(self.id, self.blocks_per_thread, |cache| cache.pop());
        if let Some(Some(ptr)) = cached {
            return ptr;
        }
        self.slab.alloc()
    }

    /// Return a block to the pool.
    ///
    /// Parks the block in the calling thread's cache when it has room;
    /// otherwise hands it back to the shared slab, subject to the slab's
    /// full validation. Null is [`Error::InvalidArgs`]. A parked block is
    /// not validated until it falls through to the slab.
    pub fn free(&self, ptr: *mut u8) -> Result<(), Error> {
        if ptr.is_null() {
            return Err(Error::InvalidArgs);
        }
        let parked = thread_cache::with_cache(self.id, self.blocks_per_thread, |cache| {
            cache.push(ptr)
        })
        .unwrap_or(false);
        if parked {
            return Ok(());
        }
        self.slab.free(ptr)
    }

    /// Occupancy of the underlying slab. Blocks parked in thread caches
    /// count as used here: the slab still considers them checked out, and
    /// that is the only view computable without a global walk.
    pub fn stats(&self) -> SlabStats {
        self.slab.stats()
    }

    /// Effective per-block size after cache-line rounding.
    #[inline]
    pub fn block_size(&self) -> usize {
        self.slab.block_size()
    }

    /// Per-thread cache capacity in blocks.
    #[inline]
    pub fn blocks_per_thread(&self) -> usize {
        self.blocks_per_thread
    }
}
