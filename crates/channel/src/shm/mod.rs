//! Named shared-memory regions.
//!
//! The mapper creates or opens an OS-named region, maps it read-write, and
//! reports whether this call actually allocated it — the handshake needs to
//! know who the creator is. It never interprets region contents.

use std::ptr::NonNull;
use std::slice;

use tracing::debug;

use crate::errors::Result;
use crate::names;

#[cfg(unix)]
mod posix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
use posix as platform;
#[cfg(windows)]
use windows as platform;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Create the region if missing, attach otherwise. What endpoints use.
    CreateOrOpen,
    /// Fail with `ChannelAlreadyExists` if the region exists.
    CreateNew,
    /// Fail with `ChannelNotFound` if the region does not exist.
    OpenExisting,
}

/// A mapped shared-memory region. Unmaps and closes its OS handle on drop.
#[derive(Debug)]
pub struct SharedMemory {
    os_name: String,
    created: bool,
    ptr: NonNull<u8>,
    mapping: platform::Mapping,
}

// The mapping is designed for concurrent cross-process access; moving the
// owning handle between threads is fine. Concurrent use is governed by the
// ring protocol, not by &mut.
unsafe impl Send for SharedMemory {}

impl SharedMemory {
    /// Create or open the region for `channel_name`, mapped read-write.
    ///
    /// `size` is the allocation size when this call creates the region; an
    /// existing region is mapped at its actual size.
    pub fn create_or_open(channel_name: &str, size: usize, mode: OpenMode) -> Result<Self> {
        let os_name = names::os_name(channel_name)?;
        let (mapping, ptr, created) = platform::open(&os_name, size, mode)?;
        debug!(
            name = %os_name,
            len = mapping.len(),
            created,
            "mapped shared region"
        );
        Ok(Self {
            os_name,
            created,
            ptr,
            mapping,
        })
    }

    /// Remove the OS-level name. Existing mappings stay valid; the region is
    /// reclaimed once the last process unmaps.
    pub fn unlink(channel_name: &str) -> Result<()> {
        platform::unlink(&names::os_name(channel_name)?)
    }

    /// True when this call allocated (and zero-filled) the region.
    pub fn created(&self) -> bool {
        self.created
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn os_name(&self) -> &str {
        &self.os_name
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    pub fn as_mut_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    pub fn as_slice(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len()) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len()) }
    }
}
