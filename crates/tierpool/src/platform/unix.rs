//! mmap-backed mappings. One body serves Linux and macOS: the engines use
//! nothing beyond portable `MAP_PRIVATE | MAP_ANONYMOUS`.

use core::ptr;

pub unsafe fn map_anonymous(size: usize) -> *mut u8 {
    let region = libc::mmap(
        ptr::null_mut(),
        size,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
        -1,
        0,
    );
    // mmap reports failure as MAP_FAILED (-1), not null; normalize so the
    // facade exposes a single failure value.
    if region == libc::MAP_FAILED {
        ptr::null_mut()
    } else {
        region as *mut u8
    }
}

pub unsafe fn unmap(ptr: *mut u8, size: usize) {
    libc::munmap(ptr as *mut libc::c_void, size);
}
