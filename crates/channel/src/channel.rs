//! Channel façade: a name plus a validated configuration, bound to a mapped
//! region and a ring view. Owns the mapping; dropping the channel unmaps.

use std::ptr::NonNull;

use tracing::debug;

use crate::config::ChannelConfig;
use crate::errors::{ChannelError, Result};
use crate::handshake::{self, Role};
use crate::layout::{RegionHeader, REGION_HEADER_SIZE};
use crate::ring::RingBuffer;
use crate::shm::{OpenMode, SharedMemory};

#[derive(Debug)]
pub struct Channel {
    name: String,
    config: ChannelConfig,
    shm: SharedMemory,
    ring: RingBuffer,
}

// Single-owner handle over memory designed for cross-process concurrent
// access; all shared mutation goes through the ring protocol's atomics.
unsafe impl Send for Channel {}

impl Channel {
    /// Create the region if missing, otherwise attach and validate.
    pub fn open(name: &str, config: &ChannelConfig, role: Role) -> Result<Self> {
        Self::open_inner(name, config, role, OpenMode::CreateOrOpen)
    }

    /// Attach to an existing region only; a missing name is
    /// `ChannelNotFound`.
    pub fn attach(name: &str, config: &ChannelConfig, role: Role) -> Result<Self> {
        Self::open_inner(name, config, role, OpenMode::OpenExisting)
    }

    fn open_inner(
        name: &str,
        config: &ChannelConfig,
        role: Role,
        mode: OpenMode,
    ) -> Result<Self> {
        config.validate()?;

        let total_size = REGION_HEADER_SIZE + config.ring_buffer_size;
        let shm = SharedMemory::create_or_open(name, total_size, mode)?;

        let header_ptr = shm.as_mut_ptr() as *mut RegionHeader;
        if shm.created() {
            unsafe {
                RegionHeader::initialize(
                    header_ptr,
                    config.ring_buffer_size as u64,
                    config.effective_flags().bits(),
                )
            };
            debug!(
                channel = name,
                ring_size = config.ring_buffer_size,
                "initialized shared region"
            );
        }

        let header: &RegionHeader = unsafe { &*header_ptr.cast_const() };
        if !shm.created() {
            handshake::await_ready(header)?;
            handshake::validate(header)?;
        }

        // When attaching, the header is the source of truth for the ring
        // size; the creator may have been configured differently.
        let ring_size = header.ring_size() as usize;
        if REGION_HEADER_SIZE + ring_size > shm.len() {
            return Err(ChannelError::InvalidMemoryLayout(
                "region too small for its declared ring",
            ));
        }
        if role != Role::Observer && config.max_message_size >= ring_size / 2 {
            return Err(ChannelError::InvalidOperation(
                "max_message_size must be less than half of the attached ring",
            ));
        }

        handshake::record_pid(header, role);

        let data = unsafe { shm.as_mut_ptr().add(REGION_HEADER_SIZE) };
        let base = NonNull::new(data).ok_or_else(|| {
            ChannelError::SharedMemoryError("region data area has a null base".to_string())
        })?;
        let ring = unsafe { RingBuffer::new(base, ring_size) };

        Ok(Self {
            name: name.to_string(),
            config: config.clone(),
            shm,
            ring,
        })
    }

    /// Remove the OS-level name for a channel. Attached endpoints keep
    /// working; the region is reclaimed after the last one detaches.
    pub fn unlink(name: &str) -> Result<()> {
        SharedMemory::unlink(name)
    }

    pub fn header(&self) -> &RegionHeader {
        unsafe { &*(self.shm.as_ptr() as *const RegionHeader) }
    }

    pub fn ring(&self) -> &RingBuffer {
        &self.ring
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        debug!(channel = %self.name, "closing channel");
    }
}
