use crate::errors::MapError;
use crate::platform::{self, FileHandle, RawView};
use std::mem::ManuallyDrop;
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Width in bytes of the words this layer reads and swaps.
pub const WORD_SIZE: usize = std::mem::size_of::<u64>();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

impl AccessMode {
    pub fn is_writable(self) -> bool {
        matches!(self, AccessMode::ReadWrite)
    }
}

/// A live `MAP_SHARED` window over the first `len()` bytes of a file.
///
/// SAFETY & MEMORY ORDERING:
///
/// Words are native-endian `u64`. Every access is bounds checked against the
/// mapping length, so no offset can reach outside the window.
///
/// - `compare_and_swap` / `store_u64` run with `Ordering::SeqCst` and require
///   8-byte aligned offsets. Writes that precede them in program order are
///   visible to any thread or process that later observes the new value.
/// - `read_u64` on an aligned offset is an `Ordering::Acquire` load and is
///   never torn. On an unaligned offset it is a plain unaligned load: it may
///   observe a mix of old and new bytes while another process writes, and it
///   is a data race if another thread of this process writes concurrently.
///
/// The base address returned by the OS is page aligned, so offset alignment
/// is the same as address alignment.
///
/// Dropping a `Mapping` unmaps it. Use [`Mapping::close`] to observe unmap
/// failures.
#[derive(Debug)]
pub struct Mapping {
    view: RawView,
    mode: AccessMode,
}

// All shared-state mutation goes through atomics on the mapped words.
unsafe impl Send for Mapping {}
unsafe impl Sync for Mapping {}

impl Mapping {
    /// Map the first `length` bytes of the file behind `handle`.
    ///
    /// The file must already be at least `length` bytes long; this layer never
    /// creates, grows or truncates files. The handle is only borrowed: the
    /// caller may close it once `open` returns and the mapping stays valid.
    ///
    /// # Errors
    ///
    /// - [`MapError::ZeroLength`] if `length` is 0
    /// - [`MapError::FileTooSmall`] if the file is shorter than `length`
    /// - [`MapError::Map`] if the platform mapping call fails (bad handle,
    ///   permission denied, address space exhausted)
    pub fn open<H: FileHandle + ?Sized>(
        handle: &H,
        mode: AccessMode,
        length: usize,
    ) -> Result<Self, MapError> {
        if length == 0 {
            return Err(MapError::ZeroLength);
        }

        let file_len = platform::file_len(handle).map_err(MapError::Map)?;
        if file_len < length as u64 {
            return Err(MapError::FileTooSmall { file_len, length });
        }

        let view = platform::map(handle, mode.is_writable(), length).map_err(MapError::Map)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            base = ?view.ptr,
            len = length,
            mode = ?mode,
            "Opened shared mapping"
        );

        Ok(Self { view, mode })
    }

    /// Unmap and consume the mapping.
    ///
    /// On error the mapping must still be treated as gone; there is no safe
    /// retry.
    pub fn close(self) -> Result<(), MapError> {
        let this = ManuallyDrop::new(self);
        let view = this.view;

        unsafe { platform::unmap(view) }.map_err(MapError::Unmap)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(base = ?view.ptr, len = view.len, "Closed shared mapping");

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.view.len
    }

    /// Always false for a live mapping; zero-length mappings are rejected by `open`.
    pub fn is_empty(&self) -> bool {
        self.view.len == 0
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Read the native-endian word at `offset`.
    ///
    /// `offset` need not be aligned, but only aligned reads are atomic loads.
    /// An unaligned read is a plain load: racing it against `compare_and_swap`
    /// or `store_u64` on an overlapping word from another thread of this
    /// process is a data race outside Rust's atomic guarantees, not merely a
    /// possibly torn value. Keep unaligned reads to words no in-process writer
    /// touches concurrently.
    #[inline]
    pub fn read_u64(&self, offset: usize) -> Result<u64, MapError> {
        let ptr = self.word_ptr(offset)?;

        if offset % WORD_SIZE == 0 {
            let word = unsafe { &*(ptr as *const AtomicU64) };
            Ok(word.load(Ordering::Acquire))
        } else {
            Ok(unsafe { ptr::read_unaligned(ptr as *const u64) })
        }
    }

    /// Atomically replace the word at `offset` with `new_value` if it equals
    /// `expected`.
    ///
    /// Returns the value present immediately before the operation, whether or
    /// not the swap happened. The swap succeeded iff the returned value equals
    /// `expected`.
    #[inline]
    pub fn compare_and_swap(
        &self,
        offset: usize,
        expected: u64,
        new_value: u64,
    ) -> Result<u64, MapError> {
        let word = self.atomic_word(offset)?;
        let previous = word
            .compare_exchange(expected, new_value, Ordering::SeqCst, Ordering::SeqCst)
            .unwrap_or_else(|actual| actual);
        Ok(previous)
    }

    /// Same as [`compare_and_swap`](Self::compare_and_swap), shaped like
    /// `AtomicU64::compare_exchange`: `Ok(previous)` when the swap happened,
    /// `Err(actual)` when it did not.
    #[inline]
    pub fn compare_exchange(
        &self,
        offset: usize,
        expected: u64,
        new_value: u64,
    ) -> Result<Result<u64, u64>, MapError> {
        let previous = self.compare_and_swap(offset, expected, new_value)?;
        if previous == expected {
            Ok(Ok(previous))
        } else {
            Ok(Err(previous))
        }
    }

    /// Unconditionally store `value` at `offset`.
    ///
    /// Only safe to use on words that no other writer races on.
    #[inline]
    pub fn store_u64(&self, offset: usize, value: u64) -> Result<(), MapError> {
        self.atomic_word(offset)?.store(value, Ordering::SeqCst);
        Ok(())
    }

    /// Pointer to `offset`, provided `offset + WORD_SIZE <= len`.
    #[inline]
    fn word_ptr(&self, offset: usize) -> Result<*mut u8, MapError> {
        match offset.checked_add(WORD_SIZE) {
            Some(end) if end <= self.view.len => Ok(unsafe { self.view.ptr.as_ptr().add(offset) }),
            _ => Err(MapError::OutOfBounds {
                offset,
                width: WORD_SIZE,
                len: self.view.len,
            }),
        }
    }

    #[inline]
    fn atomic_word(&self, offset: usize) -> Result<&AtomicU64, MapError> {
        if !self.mode.is_writable() {
            return Err(MapError::ReadOnly);
        }

        let ptr = self.word_ptr(offset)?;
        if offset % WORD_SIZE != 0 {
            return Err(MapError::Misaligned { offset });
        }

        Ok(unsafe { &*(ptr as *const AtomicU64) })
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        let result = unsafe { platform::unmap(self.view) };

        #[cfg(feature = "tracing")]
        if let Err(e) = &result {
            tracing::warn!(base = ?self.view.ptr, len = self.view.len, error = %e, "Failed to unmap shared mapping on drop");
        }

        #[cfg(not(feature = "tracing"))]
        let _ = result;
    }
}
