use super::RawView;
use nix::sys::mman::{self, MapFlags, ProtFlags};
use std::fs::File;
use std::io;
use std::num::NonZeroUsize;
use std::os::fd::AsFd;

pub(crate) fn file_len<H: AsFd + ?Sized>(handle: &H) -> io::Result<u64> {
    // Duplicate the descriptor so the caller's handle is never closed here.
    let file = File::from(handle.as_fd().try_clone_to_owned()?);
    Ok(file.metadata()?.len())
}

pub(crate) fn map<H: AsFd + ?Sized>(handle: &H, writable: bool, len: usize) -> io::Result<RawView> {
    let length = NonZeroUsize::new(len)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "zero-length mapping"))?;

    let prot = if writable {
        ProtFlags::PROT_READ | ProtFlags::PROT_WRITE
    } else {
        ProtFlags::PROT_READ
    };

    // MAP_SHARED: stores must reach the page cache so other processes see them.
    let ptr = unsafe { mman::mmap(None, length, prot, MapFlags::MAP_SHARED, handle.as_fd(), 0)? };

    Ok(RawView {
        ptr: ptr.cast::<u8>(),
        len,
    })
}

pub(crate) unsafe fn unmap(view: RawView) -> io::Result<()> {
    unsafe { mman::munmap(view.ptr.cast(), view.len)? };
    Ok(())
}

#[cfg(any(target_os = "linux", target_os = "android"))]
#[inline]
pub(crate) fn current_thread_id() -> u64 {
    nix::unistd::gettid().as_raw() as u64
}

#[cfg(any(target_os = "macos", target_os = "ios"))]
#[inline]
pub(crate) fn current_thread_id() -> u64 {
    let mut tid: u64 = 0;
    // Cannot fail for the calling thread.
    unsafe { libc::pthread_threadid_np(libc::pthread_self(), &mut tid) };
    tid
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios"
)))]
#[inline]
pub(crate) fn current_thread_id() -> u64 {
    unsafe { libc::pthread_self() as usize as u64 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempfile;

    #[test]
    fn test_file_len_does_not_close_handle() {
        let mut file = tempfile().unwrap();
        file.write_all(&[0u8; 100]).unwrap();

        assert_eq!(file_len(&file).unwrap(), 100);
        // Original descriptor still usable after the duplicate is dropped
        file.write_all(&[0u8; 28]).unwrap();
        assert_eq!(file_len(&file).unwrap(), 128);
    }

    #[test]
    fn test_map_zero_length_rejected() {
        let file = tempfile().unwrap();
        let err = map(&file, false, 0).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_map_and_unmap_shared_page() {
        let file = tempfile().unwrap();
        file.set_len(4096).unwrap();

        let view = map(&file, true, 4096).unwrap();
        assert_eq!(view.len, 4096);
        assert_eq!(view.ptr.as_ptr() as usize % 8, 0, "mmap base must be aligned");

        unsafe { unmap(view).unwrap() };
    }

    #[test]
    fn test_thread_id_nonzero() {
        assert_ne!(current_thread_id(), 0);
    }
}
