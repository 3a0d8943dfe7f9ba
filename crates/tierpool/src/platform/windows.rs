use core::ptr;

use windows_sys::Win32::System::Memory::{
    VirtualAlloc, VirtualFree, MEM_COMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_READWRITE,
};

pub unsafe fn map_anonymous(size: usize) -> *mut u8 {
    let result = VirtualAlloc(ptr::null(), size, MEM_RESERVE | MEM_COMMIT, PAGE_READWRITE);
    result as *mut u8
}

pub unsafe fn unmap(ptr: *mut u8, _size: usize) {
    // MEM_RELEASE frees the entire reservation; size must be 0.
    VirtualFree(ptr as *mut _, 0, MEM_RELEASE);
}
