#![no_main]

use libfuzzer_sys::fuzz_target;
use tierpool::Slab;

/// Fuzz target that interprets a byte slice as a sequence of slab
/// operations against a fixed set of tracked pointers.
///
/// Each operation is encoded as:
///   byte 0: opcode (0=alloc, 1=free, 2=double-free probe, 3=bogus-free probe)
///   byte 1: slot index (which tracked pointer to operate on)
///
/// After replaying the sequence, the slab's counters must account exactly
/// for the pointers still tracked as live.
const MAX_SLOTS: usize = 64;
const NUM_BLOCKS: usize = 128;

fuzz_target!(|data: &[u8]| {
    let slab = match Slab::create(64, NUM_BLOCKS) {
        Ok(s) => s,
        Err(_) => return,
    };
    let mut live: [*mut u8; MAX_SLOTS] = [std::ptr::null_mut(); MAX_SLOTS];

    let mut i = 0;
    while i + 2 <= data.len() {
        let opcode = data[i] & 0x03;
        let slot = (data[i + 1] as usize) % MAX_SLOTS;
        i += 2;

        match opcode {
            0 => {
                if live[slot].is_null() {
                    let p = slab.alloc();
                    if !p.is_null() {
                        unsafe { std::ptr::write_bytes(p, 0xAB, 64) };
                        live[slot] = p;
                    }
                }
            }
            1 => {
                if !live[slot].is_null() {
                    slab.free(live[slot]).expect("free of a live block failed");
                    live[slot] = std::ptr::null_mut();
                }
            }
            2 => {
                // Free twice; the second call must be rejected.
                if !live[slot].is_null() {
                    slab.free(live[slot]).expect("free of a live block failed");
                    assert!(
                        slab.free(live[slot]).is_err(),
                        "double free was not rejected"
                    );
                    live[slot] = std::ptr::null_mut();
                }
            }
            3 => {
                // A misaligned interior pointer must be rejected without
                // disturbing the counters.
                let before = slab.stats();
                if !live[slot].is_null() {
                    assert!(slab.free(live[slot].wrapping_add(1)).is_err());
                } else {
                    let mut local = 0u64;
                    assert!(slab.free(&mut local as *mut u64 as *mut u8).is_err());
                }
                assert_eq!(slab.stats(), before);
            }
            _ => unreachable!(),
        }
    }

    // The counters must match the tracked live set exactly.
    let held = live.iter().filter(|p| !p.is_null()).count();
    let stats = slab.stats();
    assert_eq!(stats.used, held);
    assert_eq!(stats.used + stats.free, NUM_BLOCKS);

    for p in live {
        if !p.is_null() {
            slab.free(p).expect("cleanup free failed");
        }
    }
    assert_eq!(slab.stats().used, 0);
});
