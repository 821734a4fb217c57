use super::RawView;
use std::fs::File;
use std::io;
use std::os::windows::io::{AsHandle, AsRawHandle};
use std::ptr::{self, NonNull};
use windows_sys::Win32::Foundation::CloseHandle;
use windows_sys::Win32::System::Memory::{
    CreateFileMappingW, FILE_MAP_READ, FILE_MAP_WRITE, MEMORY_MAPPED_VIEW_ADDRESS, MapViewOfFile,
    PAGE_READONLY, PAGE_READWRITE, UnmapViewOfFile,
};
use windows_sys::Win32::System::Threading::GetCurrentThreadId;

pub(crate) fn file_len<H: AsHandle + ?Sized>(handle: &H) -> io::Result<u64> {
    let file = File::from(handle.as_handle().try_clone_to_owned()?);
    Ok(file.metadata()?.len())
}

pub(crate) fn map<H: AsHandle + ?Sized>(
    handle: &H,
    writable: bool,
    len: usize,
) -> io::Result<RawView> {
    if len == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "zero-length mapping",
        ));
    }

    let (protect, access) = if writable {
        (PAGE_READWRITE, FILE_MAP_READ | FILE_MAP_WRITE)
    } else {
        (PAGE_READONLY, FILE_MAP_READ)
    };

    // Maximum size 0/0 maps the file at its current size, so the section
    // never grows the file behind the caller's back.
    let section = unsafe {
        CreateFileMappingW(
            handle.as_handle().as_raw_handle(),
            ptr::null(),
            protect,
            0,
            0,
            ptr::null(),
        )
    };
    if section.is_null() {
        return Err(io::Error::last_os_error());
    }

    let view = unsafe { MapViewOfFile(section, access, 0, 0, len) };
    // Capture the error before CloseHandle can overwrite it.
    let map_err = view.Value.is_null().then(io::Error::last_os_error);

    // The view holds its own reference to the section.
    unsafe { CloseHandle(section) };

    if let Some(err) = map_err {
        return Err(err);
    }

    let ptr = NonNull::new(view.Value.cast::<u8>()).ok_or_else(io::Error::last_os_error)?;
    Ok(RawView { ptr, len })
}

pub(crate) unsafe fn unmap(view: RawView) -> io::Result<()> {
    let address = MEMORY_MAPPED_VIEW_ADDRESS {
        Value: view.ptr.as_ptr().cast(),
    };
    if unsafe { UnmapViewOfFile(address) } == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[inline]
pub(crate) fn current_thread_id() -> u64 {
    unsafe { GetCurrentThreadId() as u64 }
}
