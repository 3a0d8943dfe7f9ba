//! Per-thread free-block cache storage.
//!
//! Each thread keeps a bounded LIFO of cached block pointers per pool,
//! looked up by the pool's unique id. Storage is created lazily on first
//! use and freed by TLS destruction at thread exit; any pointers still
//! cached at that point remain checked out of the pool's slab.

use std::cell::RefCell;

/// One pool's cache on one thread.
pub(super) struct Cache {
    slots: Vec<*mut u8>,
    limit: usize,
}

impl Cache {
    fn new(limit: usize) -> Option<Self> {
        let mut slots = Vec::new();
        if slots.try_reserve_exact(limit).is_err() {
            return None;
        }
        Some(Cache { slots, limit })
    }

    #[inline]
    pub(super) fn pop(&mut self) -> Option<*mut u8> {
        self.slots.pop()
    }

    /// Park a block. Returns false when the cache is at its limit.
    #[inline]
    pub(super) fn push(&mut self, ptr: *mut u8) -> bool {
        if self.slots.len() < self.limit {
            self.slots.push(ptr);
            true
        } else {
            false
        }
    }
}

struct Entry {
    pool_id: u64,
    cache: Cache,
}

thread_local! {
    static CACHES: RefCell<Vec<Entry>> = const { RefCell::new(Vec::new()) };
}

/// Run `f` against the calling thread's cache for `pool_id`, creating the
/// cache on first use. Returns `None` when the cache is unusable -- TLS
/// already torn down, a reentrant call, or cache storage that could not be
/// reserved -- and the caller falls back to the shared slab.
pub(super) fn with_cache<F, R>(pool_id: u64, limit: usize, f: F) -> Option<R>
where
    F: FnOnce(&mut Cache) -> R,
{
    CACHES
        .try_with(|cell| {
            let mut entries = cell.try_borrow_mut().ok()?;
            if let Some(at) = entries.iter().position(|e| e.pool_id == pool_id) {
                return Some(f(&mut entries[at].cache));
            }
            let cache = Cache::new(limit)?;
            if entries.try_reserve(1).is_err() {
                return None;
            }
            entries.push(Entry { pool_id, cache });
            let entry = entries.last_mut()?;
            Some(f(&mut entry.cache))
        })
        .ok()
        .flatten()
}
