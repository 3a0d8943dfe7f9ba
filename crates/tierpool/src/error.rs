use std::fmt;
use std::io;

/// Errors surfaced by the allocator engines.
///
/// Exhaustion is not an error: `alloc` reports it by returning null, and it
/// is recoverable by freeing blocks (slab/pool) or resetting (arena).
#[derive(Debug)]
pub enum Error {
    /// A zero size or count at construction, a zero-size arena request, or
    /// a null pointer passed to `free`.
    InvalidArgs,
    /// The OS refused the backing mapping at construction.
    OutOfMemory(io::Error),
    /// `free` was handed a pointer the engine never issued: outside the
    /// buffer, off the block grid, out of range, or already free.
    InvalidFree,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgs => f.write_str("invalid arguments"),
            Error::OutOfMemory(e) => write!(f, "backing mapping failed: {e}"),
            Error::InvalidFree => f.write_str("pointer is not a live allocation of this engine"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::OutOfMemory(e) => Some(e),
            _ => None,
        }
    }
}
