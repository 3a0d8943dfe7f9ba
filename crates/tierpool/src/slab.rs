//! Fixed-size block engine.
//!
//! A slab owns a single anonymous mapping laid out as
//!
//! ```text
//! [ BlockMeta[n] ][ free_list[n] ][ pad to page ][ block 0 | block 1 | ... ]
//! ```
//!
//! Allocation pops a block index off a lock-free free-index stack; `free`
//! validates the pointer against the block's metadata before pushing the
//! index back. Per-block magic tags catch double frees and foreign
//! pointers structurally, without any out-of-band tracking.

use crate::error::Error;
use crate::platform;
use crate::util::{align_up, CACHE_LINE, PAGE_SIZE};
use crossbeam_utils::{Backoff, CachePadded};
use std::io;
use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};

/// Stamped on a block's metadata while it sits on the free list.
const FREE_MAGIC: u64 = 0xDEAD_BEEF_DEAD_BEEF;

/// Stamped on a block's metadata while it is checked out.
const ALLOCATED_MAGIC: u64 = 0xA110_CA7E_DEAD_0001;

/// Marks a free-list slot whose index has been consumed by an allocation,
/// or claimed by a freer that has not yet published.
const SLOT_EMPTY: usize = usize::MAX;

/// Per-block state, stored in the mapping header. The fields are atomic
/// because validation of a `free` call races alloc/free traffic on
/// neighboring blocks; atomicity rules out torn reads of the tags.
#[repr(C)]
struct BlockMeta {
    magic: AtomicU64,
    free: AtomicU32,
    /// The block's own index, written once at creation. Redundant with the
    /// pointer arithmetic in `free`, kept as a cross-check against
    /// metadata corruption.
    index: usize,
}

/// Point-in-time slab occupancy, as reported by [`Slab::stats`].
///
/// Under concurrent mutation the two counters are sampled independently
/// and may be momentarily inconsistent; at quiescence
/// `used + free == num_blocks` always holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlabStats {
    /// Blocks currently checked out.
    pub used: usize,
    /// Blocks currently on the free list.
    pub free: usize,
}

/// A fixed-size block allocator over a pre-sized region.
///
/// All operations take `&self`: the slab is safe to share across threads
/// and coordinates entirely through atomics. Dropping the slab unmaps the
/// region; the host must guarantee no thread is mid-call at that point.
pub struct Slab {
    base: *mut u8,
    mapped_size: usize,
    data: *mut u8,
    meta: *mut BlockMeta,
    free_list: *mut AtomicUsize,
    block_size: usize,
    num_blocks: usize,
    free_top: CachePadded<AtomicUsize>,
    free_count: CachePadded<AtomicUsize>,
}

unsafe impl Send for Slab {}
unsafe impl Sync for Slab {}

impl Slab {
    /// Create a slab of `num_blocks` blocks of `block_size` bytes each.
    ///
    /// `block_size` is rounded up to a whole cache line. Fails with
    /// [`Error::InvalidArgs`] when either argument is zero and with
    /// [`Error::OutOfMemory`] when the backing mapping cannot be obtained.
    pub fn create(block_size: usize, num_blocks: usize) -> Result<Self, Error> {
        if block_size == 0 || num_blocks == 0 {
            return Err(Error::InvalidArgs);
        }
        let block_size = align_up(block_size, CACHE_LINE);

        let meta_bytes = num_blocks
            .checked_mul(mem::size_of::<BlockMeta>())
            .ok_or(Error::InvalidArgs)?;
        let list_bytes = num_blocks
            .checked_mul(mem::size_of::<AtomicUsize>())
            .ok_or(Error::InvalidArgs)?;
        let header_bytes = meta_bytes
            .checked_add(list_bytes)
            .map(|b| align_up(b, PAGE_SIZE))
            .ok_or(Error::InvalidArgs)?;
        let data_bytes = num_blocks
            .checked_mul(block_size)
            .map(|b| align_up(b, PAGE_SIZE))
            .ok_or(Error::InvalidArgs)?;
        let mapped_size = header_bytes
            .checked_add(data_bytes)
            .ok_or(Error::InvalidArgs)?;

        let base = unsafe { platform::map_anonymous(mapped_size) };
        if base.is_null() {
            return Err(Error::OutOfMemory(io::Error::last_os_error()));
        }

        let meta = base as *mut BlockMeta;
        let free_list = unsafe { base.add(meta_bytes) as *mut AtomicUsize };
        let data = unsafe { base.add(header_bytes) };

        for i in 0..num_blocks {
            unsafe {
                meta.add(i).write(BlockMeta {
                    magic: AtomicU64::new(FREE_MAGIC),
                    free: AtomicU32::new(1),
                    index: i,
                });
                free_list.add(i).write(AtomicUsize::new(i));
            }
        }

        Ok(Slab {
            base,
            mapped_size,
            data,
            meta,
            free_list,
            block_size,
            num_blocks,
            free_top: CachePadded::new(AtomicUsize::new(num_blocks)),
            free_count: CachePadded::new(AtomicUsize::new(num_blocks)),
        })
    }

    /// Pop a free block. Returns a cache-line-aligned pointer, or null when
    /// every block is checked out.
    pub fn alloc(&self) -> *mut u8 {
        let backoff = Backoff::new();

        // Claim exclusive right to consume free-list slot `top - 1`.
        let mut top = self.free_top.load(Ordering::Acquire);
        loop {
            if top == 0 {
                return ptr::null_mut();
            }
            match self.free_top.compare_exchange_weak(
                top,
                top - 1,
                Ordering::Acquire,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => {
                    top = observed;
                    backoff.spin();
                }
            }
        }

        // A freer that claimed this position may not have published its
        // index yet; spin out that window. The acquire swap pairs with the
        // freer's release publish, making the block's metadata transition
        // visible before we touch it.
        let slot = unsafe { &*self.free_list.add(top - 1) };
        let index = loop {
            let value = slot.swap(SLOT_EMPTY, Ordering::Acquire);
            if value != SLOT_EMPTY {
                break value;
            }
            backoff.spin();
        };
        debug_assert!(index < self.num_blocks);

        let meta = unsafe { &*self.meta.add(index) };
        debug_assert_eq!(meta.magic.load(Ordering::Relaxed), FREE_MAGIC);
        meta.magic.store(ALLOCATED_MAGIC, Ordering::Relaxed);
        meta.free.store(0, Ordering::Release);
        self.free_count.fetch_sub(1, Ordering::Relaxed);

        unsafe { self.data.add(index * self.block_size) }
    }

    /// Return a block to the slab.
    ///
    /// Validation is structural: the pointer must land exactly on a block
    /// boundary inside the data region, and the block's metadata must show
    /// it checked out. Double frees and pointers this slab never issued
    /// are rejected with [`Error::InvalidFree`] and leave the slab
    /// untouched. Null is [`Error::InvalidArgs`].
    pub fn free(&self, ptr: *mut u8) -> Result<(), Error> {
        if ptr.is_null() {
            return Err(Error::InvalidArgs);
        }
        let addr = ptr as usize;
        let data = self.data as usize;
        if addr < data {
            return Err(Error::InvalidFree);
        }
        let offset = addr - data;
        if offset % self.block_size != 0 {
            return Err(Error::InvalidFree);
        }
        let index = offset / self.block_size;
        if index >= self.num_blocks {
            return Err(Error::InvalidFree);
        }

        let meta = unsafe { &*self.meta.add(index) };
        if meta.index != index {
            return Err(Error::InvalidFree);
        }
        // A single compare-exchange claims the block: double frees and
        // never-issued blocks fail here without any window between the tag
        // check and the state flip.
        if meta
            .magic
            .compare_exchange(
                ALLOCATED_MAGIC,
                FREE_MAGIC,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return Err(Error::InvalidFree);
        }
        meta.free.store(1, Ordering::Release);

        // Claim a stack position, then publish the index into it. The
        // magic claim above admits each block at most once, so `free_top`
        // cannot run past `num_blocks`. The slot may still hold an index a
        // concurrent allocation has claimed but not yet consumed; the
        // compare-exchange waits for the consumer's swap-to-empty.
        let position = self.free_top.fetch_add(1, Ordering::AcqRel);
        debug_assert!(position < self.num_blocks);
        let slot = unsafe { &*self.free_list.add(position) };
        let backoff = Backoff::new();
        while slot
            .compare_exchange_weak(SLOT_EMPTY, index, Ordering::Release, Ordering::Relaxed)
            .is_err()
        {
            backoff.spin();
        }

        self.free_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Point-in-time occupancy. May be slightly stale under concurrent
    /// mutation; exact at quiescence.
    pub fn stats(&self) -> SlabStats {
        let free = self.free_count.load(Ordering::Relaxed);
        SlabStats {
            used: self.num_blocks - free,
            free,
        }
    }

    /// Effective per-block size after cache-line rounding.
    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Total number of blocks in the slab.
    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }
}

impl Drop for Slab {
    fn drop(&mut self) {
        unsafe { platform::unmap(self.base, self.mapped_size) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::is_aligned;

    #[test]
    fn create_rejects_zero_arguments() {
        assert!(matches!(Slab::create(0, 8), Err(Error::InvalidArgs)));
        assert!(matches!(Slab::create(64, 0), Err(Error::InvalidArgs)));
    }

    #[test]
    fn block_size_rounds_up_to_cache_line() {
        let slab = Slab::create(1, 4).unwrap();
        assert_eq!(slab.block_size(), CACHE_LINE);

        let slab = Slab::create(CACHE_LINE + 1, 4).unwrap();
        assert_eq!(slab.block_size(), 2 * CACHE_LINE);
    }

    #[test]
    fn alloc_returns_aligned_distinct_pointers() {
        let slab = Slab::create(100, 16).unwrap();
        let mut seen = Vec::new();
        for _ in 0..16 {
            let p = slab.alloc();
            assert!(!p.is_null());
            assert!(is_aligned(p as usize, CACHE_LINE));
            assert!(!seen.contains(&p), "slab handed out the same block twice");
            seen.push(p);
        }
        for p in seen {
            slab.free(p).unwrap();
        }
    }

    #[test]
    fn alloc_free_round_trip_restores_stats() {
        let slab = Slab::create(128, 10).unwrap();
        let before = slab.stats();

        let p = slab.alloc();
        assert!(!p.is_null());
        assert_eq!(slab.stats(), SlabStats { used: 1, free: 9 });

        slab.free(p).unwrap();
        assert_eq!(slab.stats(), before);
    }

    #[test]
    fn exhaustion_returns_null_and_recovers() {
        let slab = Slab::create(64, 3).unwrap();
        let a = slab.alloc();
        let b = slab.alloc();
        let c = slab.alloc();
        assert!(!a.is_null() && !b.is_null() && !c.is_null());
        assert!(slab.alloc().is_null());
        assert_eq!(slab.stats(), SlabStats { used: 3, free: 0 });

        slab.free(b).unwrap();
        let d = slab.alloc();
        assert!(!d.is_null());
        assert_eq!(slab.stats(), SlabStats { used: 3, free: 0 });

        slab.free(a).unwrap();
        slab.free(c).unwrap();
        slab.free(d).unwrap();
    }

    #[test]
    fn double_free_is_rejected() {
        let slab = Slab::create(128, 10).unwrap();
        let p = slab.alloc();
        assert!(slab.free(p).is_ok());
        assert!(matches!(slab.free(p), Err(Error::InvalidFree)));
        assert_eq!(slab.stats(), SlabStats { used: 0, free: 10 });
    }

    #[test]
    fn foreign_and_misaligned_pointers_are_rejected() {
        let slab = Slab::create(64, 4).unwrap();
        let p = slab.alloc();
        assert!(!p.is_null());

        let mut local = 0u64;
        let bogus = &mut local as *mut u64 as *mut u8;
        assert!(slab.free(bogus).is_err());

        // Off the block grid.
        assert!(slab.free(p.wrapping_add(3)).is_err());

        // Rejections must not disturb the counters.
        assert_eq!(slab.stats(), SlabStats { used: 1, free: 3 });
        slab.free(p).unwrap();
    }

    #[test]
    fn null_free_is_invalid_args() {
        let slab = Slab::create(64, 4).unwrap();
        assert!(matches!(
            slab.free(ptr::null_mut()),
            Err(Error::InvalidArgs)
        ));
    }

    #[test]
    fn freed_blocks_are_reissued_lifo() {
        let slab = Slab::create(64, 8).unwrap();
        let p = slab.alloc();
        slab.free(p).unwrap();
        // The free-index stack is LIFO: the block just released is the
        // next one handed out.
        assert_eq!(slab.alloc(), p);
        slab.free(p).unwrap();
    }
}
