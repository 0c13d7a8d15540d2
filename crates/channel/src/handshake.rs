//! First-attacher-initializes, later-attachers-validate.
//!
//! The creator (the process whose open call actually allocated the region)
//! fills the header and publishes the magic last with a release store. A
//! late attacher that still sees a zero magic treats initialization as in
//! progress and spin-validates with a bounded retry.

use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use tracing::trace;

use crate::errors::{ChannelError, Result};
use crate::layout::{is_power_of_two, ProtocolVersion, RegionHeader, REGION_MAGIC};

const ATTACH_RETRY_LIMIT: u32 = 200;
const ATTACH_RETRY_SLEEP: Duration = Duration::from_micros(500);

/// Minimum legal ring size, matching the configuration floor.
const MIN_RING_SIZE: u64 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Sender,
    Receiver,
    /// Diagnostics-only attacher; records no PID.
    Observer,
}

/// Wait for the creator to publish the header magic.
pub(crate) fn await_ready(header: &RegionHeader) -> Result<()> {
    for attempt in 0..ATTACH_RETRY_LIMIT {
        if header.magic.load(Ordering::Acquire) == REGION_MAGIC {
            if attempt > 0 {
                trace!(attempt, "region became ready while attaching");
            }
            return Ok(());
        }
        std::hint::spin_loop();
        thread::sleep(ATTACH_RETRY_SLEEP);
    }
    Err(ChannelError::ChannelNotFound)
}

/// Validate a published header against this endpoint's protocol.
pub(crate) fn validate(header: &RegionHeader) -> Result<()> {
    if header.magic.load(Ordering::Acquire) != REGION_MAGIC {
        return Err(ChannelError::InvalidMemoryLayout("bad region magic"));
    }

    let found = ProtocolVersion::unpack(header.version);
    if !ProtocolVersion::CURRENT.is_compatible_with(found) {
        return Err(ChannelError::VersionMismatch {
            found,
            expected: ProtocolVersion::CURRENT,
        });
    }

    if !is_power_of_two(header.ring_size as usize) || header.ring_size < MIN_RING_SIZE {
        return Err(ChannelError::InvalidMemoryLayout(
            "ring size must be a power of two of at least 4096",
        ));
    }

    Ok(())
}

/// Record the attaching process in the advisory PID field for its role.
pub(crate) fn record_pid(header: &RegionHeader, role: Role) {
    let pid = std::process::id();
    match role {
        Role::Sender => header.sender_pid.store(pid, Ordering::Relaxed),
        Role::Receiver => header.receiver_pid.store(pid, Ordering::Relaxed),
        Role::Observer => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn initialized_header(ring_size: u64) -> Box<RegionHeader> {
        let ptr = Box::into_raw(Box::new(RegionHeader::zeroed()));
        unsafe { RegionHeader::initialize(ptr, ring_size, 0) };
        unsafe { Box::from_raw(ptr) }
    }

    #[test]
    fn test_initialized_header_validates() {
        let header = initialized_header(65536);
        assert!(await_ready(&header).is_ok());
        assert!(validate(&header).is_ok());
    }

    #[test]
    fn test_uninitialized_header_times_out() {
        let header = RegionHeader::zeroed();
        assert!(matches!(
            await_ready(&header),
            Err(ChannelError::ChannelNotFound)
        ));
    }

    #[test]
    fn test_version_major_mismatch_rejected() {
        let mut header = initialized_header(65536);
        header.version = ProtocolVersion {
            major: 2,
            minor: 0,
            patch: 0,
        }
        .pack();

        match validate(&header) {
            Err(ChannelError::VersionMismatch { found, expected }) => {
                assert_eq!(found.major, 2);
                assert_eq!(expected, ProtocolVersion::CURRENT);
            }
            other => panic!("expected VersionMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_minor_version_difference_accepted() {
        let mut header = initialized_header(65536);
        header.version = ProtocolVersion {
            major: 1,
            minor: 3,
            patch: 7,
        }
        .pack();
        assert!(validate(&header).is_ok());
    }

    #[test]
    fn test_bad_ring_size_rejected() {
        for ring in [0u64, 1000, 2048] {
            let mut header = initialized_header(65536);
            header.ring_size = ring;
            assert!(
                matches!(
                    validate(&header),
                    Err(ChannelError::InvalidMemoryLayout(_))
                ),
                "ring_size {ring} should be rejected"
            );
        }
    }

    #[test]
    fn test_record_pid_by_role() {
        let header = initialized_header(65536);
        record_pid(&header, Role::Sender);
        assert_eq!(header.sender_pid(), std::process::id());
        assert_eq!(header.receiver_pid(), 0);

        record_pid(&header, Role::Receiver);
        assert_eq!(header.receiver_pid(), std::process::id());

        let before = (header.sender_pid(), header.receiver_pid());
        record_pid(&header, Role::Observer);
        assert_eq!(
            (header.sender_pid(), header.receiver_pid()),
            before,
            "observers must not claim a PID slot"
        );
    }
}
