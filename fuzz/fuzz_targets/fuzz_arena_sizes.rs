#![no_main]

use libfuzzer_sys::fuzz_target;
use tierpool::util::{is_aligned, CACHE_LINE};
use tierpool::Arena;

/// Fuzz target that drives an arena with arbitrary request sizes (with the
/// occasional reset), checking the bump invariants after every operation:
/// offsets only grow within capacity, returned pointers are line-aligned,
/// in-bounds, and monotonically increasing within an era.
const CAPACITY: usize = 64 * 1024;

fuzz_target!(|data: &[u8]| {
    let arena = match Arena::create(CAPACITY) {
        Ok(a) => a,
        Err(_) => return,
    };
    let base = {
        let p = arena.alloc(1);
        arena.reset();
        p as usize
    };
    let mut last = base;

    let mut i = 0;
    while i + 3 <= data.len() {
        let size = u16::from_le_bytes([data[i], data[i + 1]]) as usize;
        let do_reset = data[i + 2] & 0x0F == 0;
        i += 3;

        if do_reset {
            arena.reset();
            assert_eq!(arena.stats().used, 0);
            last = base;
            continue;
        }

        let before = arena.stats().used;
        let p = arena.alloc(size);
        let after = arena.stats();

        if p.is_null() {
            // Zero or oversized requests must not consume anything.
            assert_eq!(after.used, before);
            continue;
        }

        assert!(is_aligned(p as usize, CACHE_LINE));
        assert!(p as usize >= last, "arena moved backwards within an era");
        assert!(
            p as usize + size <= base + arena.capacity(),
            "allocation escapes the buffer"
        );
        assert_eq!(after.used, before + (size + CACHE_LINE - 1) / CACHE_LINE * CACHE_LINE);
        assert!(after.used <= after.capacity);
        last = p as usize + size;
    }
});
