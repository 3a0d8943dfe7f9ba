//! OS page mapping.
//!
//! The engines size every region in whole pages, so a page-granular
//! anonymous mapping is the only service they need from the OS. Page
//! alignment also delivers the cache-line alignment of each data region
//! for free.

#[cfg(unix)]
pub mod unix;
#[cfg(unix)]
pub use unix as sys;

#[cfg(windows)]
pub mod windows;
#[cfg(windows)]
pub use windows as sys;

/// Reserve and commit an anonymous read-write region of `size` bytes.
/// Null signals failure; the engines turn that into `Error::OutOfMemory`
/// with the OS error attached.
///
/// # Safety
/// `size` must be a nonzero multiple of the page size. The region is
/// released only through [`unmap`]; nothing reclaims it otherwise.
#[inline]
pub unsafe fn map_anonymous(size: usize) -> *mut u8 {
    sys::map_anonymous(size)
}

/// Release a region obtained from [`map_anonymous`].
///
/// # Safety
/// `ptr`/`size` must name exactly one prior successful [`map_anonymous`]
/// call, and no pointer into the region may be used afterwards.
#[inline]
pub unsafe fn unmap(ptr: *mut u8, size: usize) {
    sys::unmap(ptr, size);
}
