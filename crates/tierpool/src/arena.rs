//! Bump engine.
//!
//! An arena serves variable-size allocations by advancing a single atomic
//! offset over a contiguous buffer. There is no per-allocation free:
//! [`Arena::reset`] releases everything at once, and the buffer is reused
//! for the next era. Exhaustion is non-sticky.

use crate::error::Error;
use crate::platform;
use crate::util::{align_up, CACHE_LINE, PAGE_SIZE};
use crossbeam_utils::{Backoff, CachePadded};
use std::io;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Point-in-time arena occupancy, as reported by [`Arena::stats`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArenaStats {
    /// Bytes consumed since the last reset.
    pub used: usize,
    /// Total capacity in bytes (after cache-line rounding).
    pub capacity: usize,
}

/// A bump allocator over a single contiguous buffer.
///
/// Allocation is a compare-exchange on the offset; concurrent callers
/// never receive overlapping ranges because only the winning exchange
/// publishes the new offset. The offset itself uses relaxed ordering: a
/// returned pointer is not a publication channel, and callers that use
/// one as such must add their own fences.
pub struct Arena {
    base: *mut u8,
    mapped_size: usize,
    capacity: usize,
    offset: CachePadded<AtomicUsize>,
}

unsafe impl Send for Arena {}
unsafe impl Sync for Arena {}

impl Arena {
    /// Create an arena of `capacity` bytes, rounded up to a whole cache
    /// line. Fails with [`Error::InvalidArgs`] on zero capacity and
    /// [`Error::OutOfMemory`] when the mapping cannot be obtained.
    pub fn create(capacity: usize) -> Result<Self, Error> {
        if capacity == 0 {
            return Err(Error::InvalidArgs);
        }
        let capacity = capacity
            .checked_add(CACHE_LINE - 1)
            .ok_or(Error::InvalidArgs)?
            & !(CACHE_LINE - 1);
        let mapped_size = align_up(capacity, PAGE_SIZE);

        let base = unsafe { platform::map_anonymous(mapped_size) };
        if base.is_null() {
            return Err(Error::OutOfMemory(io::Error::last_os_error()));
        }

        Ok(Arena {
            base,
            mapped_size,
            capacity,
            offset: CachePadded::new(AtomicUsize::new(0)),
        })
    }

    /// Claim `size` bytes, rounded up to a whole cache line. Returns a
    /// cache-line-aligned pointer, or null when `size` is zero or the
    /// remaining capacity is insufficient. A failed attempt does not
    /// advance the offset.
    pub fn alloc(&self, size: usize) -> *mut u8 {
        if size == 0 || size > self.capacity {
            return ptr::null_mut();
        }
        let size = align_up(size, CACHE_LINE);

        let backoff = Backoff::new();
        let mut current = self.offset.load(Ordering::Relaxed);
        loop {
            let next = current + size;
            if next > self.capacity {
                return ptr::null_mut();
            }
            match self.offset.compare_exchange_weak(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return unsafe { self.base.add(current) },
                Err(observed) => {
                    current = observed;
                    backoff.spin();
                }
            }
        }
    }

    /// Invalidate every outstanding pointer and make the full capacity
    /// available again. Idempotent. Bytes are not zeroed; the contents of
    /// the buffer after a reset are unspecified. The host must guarantee
    /// no allocation is in flight.
    pub fn reset(&self) {
        self.offset.store(0, Ordering::Relaxed);
    }

    /// Point-in-time usage. Exact at quiescence.
    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            used: self.offset.load(Ordering::Relaxed),
            capacity: self.capacity,
        }
    }

    /// Capacity in bytes after cache-line rounding.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        unsafe { platform::unmap(self.base, self.mapped_size) };
    }
}
