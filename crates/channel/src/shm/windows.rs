//! Windows backend: named pagefile-backed file mappings.

use std::ffi::c_void;
use std::io;
use std::ptr::{null, NonNull};

use windows_sys::Win32::Foundation::{
    CloseHandle, GetLastError, ERROR_ACCESS_DENIED, ERROR_ALREADY_EXISTS, ERROR_FILE_NOT_FOUND,
    ERROR_NOT_ENOUGH_MEMORY, HANDLE, INVALID_HANDLE_VALUE,
};
use windows_sys::Win32::System::Memory::{
    CreateFileMappingW, MapViewOfFile, OpenFileMappingW, UnmapViewOfFile, VirtualQuery,
    FILE_MAP_ALL_ACCESS, MEMORY_BASIC_INFORMATION, MEMORY_MAPPED_VIEW_ADDRESS, PAGE_READWRITE,
};

use super::OpenMode;
use crate::errors::{ChannelError, Result};

#[derive(Debug)]
pub(super) struct Mapping {
    handle: HANDLE,
    view: *mut c_void,
    len: usize,
}

impl Mapping {
    pub(super) fn len(&self) -> usize {
        self.len
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        unsafe {
            UnmapViewOfFile(MEMORY_MAPPED_VIEW_ADDRESS { Value: self.view });
            CloseHandle(self.handle);
        }
    }
}

// The view pointer targets a shared mapping; ownership of the handle moves
// with the struct.
unsafe impl Send for Mapping {}

pub(super) fn open(os_name: &str, size: usize, mode: OpenMode) -> Result<(Mapping, NonNull<u8>, bool)> {
    let wide: Vec<u16> = os_name.encode_utf16().chain(std::iter::once(0)).collect();

    let (handle, created) = match mode {
        OpenMode::OpenExisting => {
            let handle = unsafe { OpenFileMappingW(FILE_MAP_ALL_ACCESS, 0, wide.as_ptr()) };
            if handle.is_null() {
                return Err(translate(unsafe { GetLastError() }));
            }
            (handle, false)
        }
        OpenMode::CreateNew | OpenMode::CreateOrOpen => {
            let handle = unsafe {
                CreateFileMappingW(
                    INVALID_HANDLE_VALUE,
                    null(),
                    PAGE_READWRITE,
                    (size as u64 >> 32) as u32,
                    size as u32,
                    wide.as_ptr(),
                )
            };
            if handle.is_null() {
                return Err(translate(unsafe { GetLastError() }));
            }
            let already_exists = unsafe { GetLastError() } == ERROR_ALREADY_EXISTS;
            if already_exists && mode == OpenMode::CreateNew {
                unsafe { CloseHandle(handle) };
                return Err(ChannelError::ChannelAlreadyExists);
            }
            (handle, !already_exists)
        }
    };

    let view = unsafe { MapViewOfFile(handle, FILE_MAP_ALL_ACCESS, 0, 0, 0) };
    if view.Value.is_null() {
        let err = io::Error::last_os_error();
        unsafe { CloseHandle(handle) };
        return Err(ChannelError::MappingFailed(err));
    }

    let len = view_len(view.Value).unwrap_or(size);
    let ptr = NonNull::new(view.Value as *mut u8).ok_or_else(|| {
        ChannelError::SharedMemoryError("MapViewOfFile returned a null view".to_string())
    })?;

    Ok((
        Mapping {
            handle,
            view: view.Value,
            len,
        },
        ptr,
        created,
    ))
}

/// The section's lifetime on Windows is its last open handle; there is no
/// name to remove.
pub(super) fn unlink(_os_name: &str) -> Result<()> {
    Ok(())
}

fn view_len(view: *const c_void) -> Option<usize> {
    let mut info: MEMORY_BASIC_INFORMATION = unsafe { std::mem::zeroed() };
    let written = unsafe {
        VirtualQuery(
            view,
            &mut info,
            std::mem::size_of::<MEMORY_BASIC_INFORMATION>(),
        )
    };
    (written != 0).then_some(info.RegionSize)
}

fn translate(code: u32) -> ChannelError {
    match code {
        ERROR_FILE_NOT_FOUND => ChannelError::ChannelNotFound,
        ERROR_ALREADY_EXISTS => ChannelError::ChannelAlreadyExists,
        ERROR_ACCESS_DENIED => ChannelError::PermissionDenied,
        ERROR_NOT_ENOUGH_MEMORY => ChannelError::OutOfMemory,
        other => ChannelError::SystemError(other as i32),
    }
}
