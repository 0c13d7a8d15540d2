use bitflags::bitflags;

use crate::errors::{ChannelError, Result};
use crate::layout::is_power_of_two;

bitflags! {
    /// Region feature flags, stored verbatim in the region header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ChannelFlags: u64 {
        /// Payload checksums are disabled (the checksum field is 0).
        const NO_CHECKSUM = 1 << 0;

        /// Overwrite oldest frames when the buffer is full.
        ///
        /// Declared for header compatibility; the producer currently
        /// reports `ChannelFull` regardless.
        const OVERWRITE = 1 << 1;

        /// Exactly one sender attaches to this channel.
        const SINGLE_PRODUCER = 1 << 2;

        /// Exactly one receiver attaches to this channel.
        const SINGLE_CONSUMER = 1 << 3;
    }
}

/// Channel configuration, immutable after open.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Byte size of the ring data area. Power of two, at least 4096.
    pub ring_buffer_size: usize,

    /// Largest accepted payload. At least 64, less than half the ring.
    pub max_message_size: usize,

    /// Feature flags recorded in the region header.
    pub flags: ChannelFlags,

    /// Advisory poll timeout in microseconds; not consumed by the core.
    pub timeout_us: u64,

    /// Mirror of `!NO_CHECKSUM`. Checksumming is reserved; leaving this
    /// false records `NO_CHECKSUM` in the header.
    pub enable_checksum: bool,

    /// Mirror of `OVERWRITE`.
    pub overwrite_on_full: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            ring_buffer_size: 1024 * 1024,
            max_message_size: 64 * 1024,
            flags: ChannelFlags::empty(),
            timeout_us: 0,
            enable_checksum: false,
            overwrite_on_full: false,
        }
    }
}

impl ChannelConfig {
    pub const MIN_RING_SIZE: usize = 4096;
    pub const MIN_MESSAGE_SIZE: usize = 64;

    pub fn validate(&self) -> Result<()> {
        if !is_power_of_two(self.ring_buffer_size) {
            return Err(ChannelError::InvalidOperation(
                "ring_buffer_size must be a power of two",
            ));
        }
        if self.ring_buffer_size < Self::MIN_RING_SIZE {
            return Err(ChannelError::InvalidOperation(
                "ring_buffer_size must be at least 4096 bytes",
            ));
        }
        if self.max_message_size < Self::MIN_MESSAGE_SIZE {
            return Err(ChannelError::InvalidOperation(
                "max_message_size must be at least 64 bytes",
            ));
        }
        if self.max_message_size >= self.ring_buffer_size / 2 {
            return Err(ChannelError::InvalidOperation(
                "max_message_size must be less than half of ring_buffer_size",
            ));
        }
        Ok(())
    }

    /// Flags as recorded in the region header, with the boolean mirrors
    /// folded in.
    pub fn effective_flags(&self) -> ChannelFlags {
        let mut flags = self.flags;
        if !self.enable_checksum {
            flags |= ChannelFlags::NO_CHECKSUM;
        }
        if self.overwrite_on_full {
            flags |= ChannelFlags::OVERWRITE;
        }
        flags
    }
}
