//! Per-target mapping backends.
//!
//! Every backend exposes the same four functions (`file_len`, `map`, `unmap`,
//! `current_thread_id`) over a [`RawView`]. Nothing above this module sees a
//! platform difference.

use std::ptr::NonNull;

#[cfg(unix)]
pub(crate) mod unix;
#[cfg(unix)]
pub(crate) use unix as sys;

#[cfg(windows)]
pub(crate) mod windows;
#[cfg(windows)]
pub(crate) use windows as sys;

/// Borrowable OS file handle accepted by [`crate::Mapping::open`].
///
/// A file descriptor on Unix, a `HANDLE` on Windows. `std::fs::File`
/// implements both.
#[cfg(unix)]
pub use std::os::fd::AsFd as FileHandle;
#[cfg(windows)]
pub use std::os::windows::io::AsHandle as FileHandle;

/// Base address and length of a live OS mapping.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RawView {
    pub ptr: NonNull<u8>,
    pub len: usize,
}

/// Current size of the file behind `handle`, in bytes.
pub(crate) fn file_len<H: FileHandle + ?Sized>(handle: &H) -> std::io::Result<u64> {
    sys::file_len(handle)
}

/// Map `len` bytes of the file behind `handle` from offset 0.
///
/// `len` must be non-zero and no larger than the file.
pub(crate) fn map<H: FileHandle + ?Sized>(
    handle: &H,
    writable: bool,
    len: usize,
) -> std::io::Result<RawView> {
    sys::map(handle, writable, len)
}

/// Release a view returned by [`map`].
///
/// # Safety
/// `view` must come from [`map`] and must not be used (or unmapped) again.
pub(crate) unsafe fn unmap(view: RawView) -> std::io::Result<()> {
    unsafe { sys::unmap(view) }
}

#[inline]
pub(crate) fn current_thread_id() -> u64 {
    sys::current_thread_id()
}
