use std::io;
use thiserror::Error;

use crate::layout::ProtocolVersion;

pub type Result<T> = std::result::Result<T, ChannelError>;

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("channel not found")]
    ChannelNotFound,

    #[error("channel already exists")]
    ChannelAlreadyExists,

    #[error("channel buffer is full")]
    ChannelFull,

    #[error("channel is closed")]
    ChannelClosed,

    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("message corrupted: bad frame magic")]
    MessageCorrupted,

    #[error("checksum mismatch")]
    ChecksumMismatch,

    #[error("out of memory")]
    OutOfMemory,

    #[error("shared memory error: {0}")]
    SharedMemoryError(String),

    #[error("memory mapping failed: {0}")]
    MappingFailed(#[source] io::Error),

    #[error("invalid memory layout: {0}")]
    InvalidMemoryLayout(&'static str),

    #[error("protocol version mismatch: region has {found}, this endpoint speaks {expected}")]
    VersionMismatch {
        found: ProtocolVersion,
        expected: ProtocolVersion,
    },

    #[error("permission denied")]
    PermissionDenied,

    #[error("resource busy")]
    ResourceBusy,

    #[error("system error: os error {0}")]
    SystemError(i32),

    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),
}

impl ChannelError {
    /// True for outcomes a non-blocking caller is expected to retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, ChannelError::ChannelFull)
    }
}
